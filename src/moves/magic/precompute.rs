//! Builds rook and bishop magic-bitboard tables from scratch by searching
//! for a collision-free magic multiplier per square, the same classical
//! "fancy magic" technique as the ray-scanning generators in `attacks.rs`.

use super::attacks::{bishop_attacks_per_square, rook_attacks_per_square};
use super::search::find_magic_number_for_square;
use super::structs::{BishopMagicTables, MagicEntry, MagicTables, RookMagicTables};
use rand::{RngCore, SeedableRng, rngs::StdRng};

const FILE_A: u64 = 0x0101_0101_0101_0101;
const FILE_H: u64 = 0x8080_8080_8080_8080;
const RANK_1: u64 = 0x0000_0000_0000_00FF;
const RANK_8: u64 = 0xFF00_0000_0000_0000;
const EDGE: u64 = FILE_A | FILE_H | RANK_1 | RANK_8;

/// How to seed the magic search. `Fixed` makes table generation
/// reproducible across runs (used by tests and the `deterministic_magic`
/// feature); `Random` draws fresh entropy each time.
pub enum MagicTableSeed {
    Fixed(u64),
    Random,
}

fn make_rng(seed: &MagicTableSeed) -> StdRng {
    match seed {
        MagicTableSeed::Fixed(s) => StdRng::seed_from_u64(*s),
        MagicTableSeed::Random => {
            let mut bytes = [0u8; 32];
            rand::rng().fill_bytes(&mut bytes);
            StdRng::from_seed(bytes)
        }
    }
}

/// All subsets of `mask`, via the standard carry-rippler enumeration.
fn subsets_of(mask: u64) -> Vec<u64> {
    let mut subsets = Vec::with_capacity(1 << mask.count_ones());
    let mut subset: u64 = 0;
    loop {
        subsets.push(subset);
        subset = subset.wrapping_sub(mask) & mask;
        if subset == 0 {
            break;
        }
    }
    subsets
}

fn build_entry(
    square: usize,
    rng: &mut StdRng,
    attacks_fn: fn(usize, u64) -> u64,
) -> Result<MagicEntry, String> {
    let mask = attacks_fn(square, 0) & !EDGE;
    let blockers = subsets_of(mask);
    let attacks: Vec<u64> = blockers.iter().map(|&b| attacks_fn(square, b)).collect();
    let shift = 64 - mask.count_ones();

    let magic = find_magic_number_for_square(&blockers, &attacks, shift, rng)?;

    let table_size = 1usize << mask.count_ones();
    let mut table = vec![0u64; table_size];
    for (&b, &a) in blockers.iter().zip(attacks.iter()) {
        let index = ((b.wrapping_mul(magic)) >> shift) as usize;
        table[index] = a;
    }

    Ok(MagicEntry {
        magic,
        shift,
        mask,
        table: table.into_boxed_slice(),
    })
}

/// Generates magic tables for every square of both sliders. Only fails if
/// the magic search exhausts its attempt budget, which practically never
/// happens for the sparse-candidate search in `search.rs`.
pub fn generate_magic_tables(seed: MagicTableSeed) -> Result<MagicTables, String> {
    let mut rng = make_rng(&seed);

    let mut rook_entries = Vec::with_capacity(64);
    for sq in 0..64 {
        rook_entries.push(build_entry(sq, &mut rng, rook_attacks_per_square)?);
    }

    let mut bishop_entries = Vec::with_capacity(64);
    for sq in 0..64 {
        bishop_entries.push(build_entry(sq, &mut rng, bishop_attacks_per_square)?);
    }

    Ok(MagicTables {
        rook: RookMagicTables {
            entries: rook_entries,
        },
        bishop: BishopMagicTables {
            entries: bishop_entries,
        },
    })
}
