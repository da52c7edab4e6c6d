//! Builds the process-wide magic tables once and hands out a shared
//! reference. Despite the name, there is no serialized table file to load —
//! tables are generated in memory by `precompute::generate_magic_tables` on
//! first use and cached behind a `OnceCell` for the life of the process.

use super::precompute::{MagicTableSeed, generate_magic_tables};
use super::structs::MagicTables;
use once_cell::sync::OnceCell;

#[cfg(feature = "deterministic_magic")]
const MAGIC_SEED: u64 = 0xC0FF_EE00_1234_5678;

fn build() -> MagicTables {
    #[cfg(feature = "deterministic_magic")]
    let seed = MagicTableSeed::Fixed(MAGIC_SEED);
    #[cfg(not(feature = "deterministic_magic"))]
    let seed = MagicTableSeed::Random;

    generate_magic_tables(seed).expect("magic number search exhausted its attempt budget")
}

/// Returns the magic tables, generating them once per process and cloning
/// the cached copy out on every call after the first.
pub fn load_magic_tables() -> MagicTables {
    static TABLES: OnceCell<MagicTables> = OnceCell::new();
    TABLES.get_or_init(build).clone()
}
