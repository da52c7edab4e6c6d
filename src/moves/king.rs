//! King attack table, re-exported from the magic-bitboard leaper tables so
//! move generation and SEE can address it without reaching into `magic`.

pub use crate::moves::magic::attacks::KING_ATTACKS;
