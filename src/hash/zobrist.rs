use crate::board::castle_bits::*;
use crate::board::{Board, Color, Piece};
use once_cell::sync::OnceCell;
use rand::{RngCore, SeedableRng, rngs::StdRng};

const FILE_A: u64 = 0x0101_0101_0101_0101;
const FILE_H: u64 = 0x8080_8080_8080_8080;

#[cfg(feature = "deterministic_zobrist")]
const ZOBRIST_SEED: u64 = 0x9E37_79B9_AAAC_5C87;

fn make_zobrist_rng() -> StdRng {
    #[cfg(feature = "deterministic_zobrist")]
    {
        StdRng::seed_from_u64(ZOBRIST_SEED)
    }
    #[cfg(not(feature = "deterministic_zobrist"))]
    {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        StdRng::from_seed(seed)
    }
}

/// Random piece-placement keys, plus the side/castling/ep keys that are
/// folded in only at read time (see [`Board::hash`]).
///
/// Pawn keys are generated with only their top 32 bits randomized (low 32
/// zeroed); every other piece's keys are generated with only their low 32
/// bits randomized (high 32 zeroed). Since side/castling/en-passant never
/// touch the incremental `Board::zobrist` field, this guarantees the top 32
/// bits of that field depend on pawn placement alone — the pawn-structure
/// cache key.
#[allow(dead_code)]
pub struct ZobristKeys {
    /// [color][piece][square] with {White=0, Black=1} and {P,N,B,R,Q,K}={0..5}
    pub piece: [[[u64; 64]; 6]; 2],
    pub side_to_move: u64,
    /// [0]=K, [1]=Q, [2]=k, [3]=q  (bit order K,Q,k,q)
    pub castling: [u64; 4],
    /// a..h => 0..7
    pub ep_file: [u64; 8],
}

#[inline]
pub fn xor_castling_rights_delta(hash: &mut u64, keys: &ZobristKeys, old: u8, new_: u8) {
    let d = old ^ new_;
    if d & CASTLE_WK != 0 {
        *hash ^= keys.castling[0];
    }
    if d & CASTLE_WQ != 0 {
        *hash ^= keys.castling[1];
    }
    if d & CASTLE_BK != 0 {
        *hash ^= keys.castling[2];
    }
    if d & CASTLE_BQ != 0 {
        *hash ^= keys.castling[3];
    }
}

/// Returns `Some(file 0..7)` if en passant should contribute to `Board::hash`
/// this ply: side-to-move must have a pawn that could pseudo-legally capture
/// onto the ep square.
pub fn ep_file_to_hash(board: &Board) -> Option<u8> {
    let ep = board.en_passant?;
    let s = ep.index();

    let r = s / 8;
    if !(r == 2 || r == 5) {
        return None;
    }

    let bb_s: u64 = 1u64 << s;

    let has_capturing_pawn = match board.side_to_move {
        Color::White => {
            let src_ne = (bb_s >> 9) & !FILE_H;
            let src_nw = (bb_s >> 7) & !FILE_A;
            ((src_ne | src_nw) & board.bb(Color::White, Piece::Pawn)) != 0
        }
        Color::Black => {
            let src_se = (bb_s << 7) & !FILE_A;
            let src_sw = (bb_s << 9) & !FILE_H;
            ((src_se | src_sw) & board.bb(Color::Black, Piece::Pawn)) != 0
        }
    };

    if has_capturing_pawn { Some(s % 8) } else { None }
}

pub fn zobrist_keys() -> &'static ZobristKeys {
    static KEYS: OnceCell<ZobristKeys> = OnceCell::new();
    KEYS.get_or_init(|| generate_zobrist_keys_with_rng(make_zobrist_rng()))
}

const LOW_32: u64 = 0x0000_0000_FFFF_FFFF;
const HIGH_32: u64 = 0xFFFF_FFFF_0000_0000;

fn generate_zobrist_keys_with_rng(mut rng: StdRng) -> ZobristKeys {
    #[inline]
    fn non_zero_masked(r: &mut StdRng, mask: u64) -> u64 {
        let mut v = r.next_u64() & mask;
        while v == 0 {
            v = r.next_u64() & mask;
        }
        v
    }

    let mut keys = ZobristKeys {
        piece: [[[0u64; 64]; 6]; 2],
        side_to_move: 0,
        castling: [0u64; 4],
        ep_file: [0u64; 8],
    };

    for c in 0..2 {
        for p in 0..6 {
            // Pawn = 0: confine to the high 32 bits so it alone forms the
            // pawn hash. Every other piece: confine to the low 32 bits so
            // it never perturbs the pawn hash.
            let mask = if p == Piece::Pawn as usize {
                HIGH_32
            } else {
                LOW_32
            };
            for sq in 0..64 {
                keys.piece[c][p][sq] = non_zero_masked(&mut rng, mask);
            }
        }
    }

    for i in 0..4 {
        keys.castling[i] = non_zero_masked(&mut rng, u64::MAX);
    }

    for f in 0..8 {
        keys.ep_file[f] = non_zero_masked(&mut rng, u64::MAX);
    }

    keys.side_to_move = non_zero_masked(&mut rng, u64::MAX);

    keys
}
