pub(crate) mod attacks;
pub mod loader;
pub mod precompute;
pub mod search;
pub mod structs;

pub use attacks::{get_king_attacks, get_knight_attacks};
pub use structs::{BishopMagicTables, MagicEntry, MagicTables, RookMagicTables};
