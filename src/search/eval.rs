//! Static evaluation: lazy `FastEval`, the full tapered `EvalSide` sum, and
//! the pawn-structure cache behind it.

use crate::board::{Board, Color, Piece};
use crate::moves::magic::MagicTables;
use crate::pair::{Pair, dot_product};
use crate::search::pesto;
use crate::square::Square;
use crate::utils::pop_lsb;
use std::cell::RefCell;

pub const LAZY_MARGIN: i32 = 200;

const MOBILITY_WEIGHT: [i32; 6] = [0, 4, 4, 3, 2, 0];
const ISOLATED_PENALTY: Pair = Pair::new(-15, -10);
const DOUBLED_PENALTY: Pair = Pair::new(-12, -22);
const BACKWARDS_PENALTY: Pair = Pair::new(-10, -5);
const TEMPO_BONUS: Pair = Pair::new(10, 5);
const ROOK_OPEN_FILE_BONUS: Pair = Pair::new(20, 10);
const ROOK_SEMI_OPEN_FILE_BONUS: Pair = Pair::new(10, 5);
const ROOK_7TH_RANK_BONUS: Pair = Pair::new(20, 30);
const KING_SHIELD_BONUS_PER_RANK: i32 = 8;
const KING_STORM_PENALTY_PER_RANK: i32 = 6;
const ATTACK_STRONGER_PIECE_BONUS: i32 = 12;

// Passed-pawn bonus by rank (0 = own back rank, 7 = promotion rank).
const PASSED_PAWN_BONUS: [Pair; 8] = [
    Pair::new(0, 0),
    Pair::new(5, 10),
    Pair::new(10, 20),
    Pair::new(20, 40),
    Pair::new(40, 80),
    Pair::new(70, 150),
    Pair::new(120, 260),
    Pair::new(0, 0),
];

// King-exposed penalty indexed by popcount of a virtual-queen's attack set
// from the king square: the more squares a queen would see from there, the
// more open the king's position.
const KING_EXPOSED_PENALTY: [i32; 28] = [
    0, 0, 1, 2, 3, 5, 7, 9, 11, 13, 16, 19, 22, 25, 28, 31, 34, 37, 40, 43, 46, 49, 52, 55, 58, 61,
    64, 67,
];

// Piece-pairs: own pair / mixed-singleton bonus over {N, B, R, Q}, per spec
// 4.4 "Piece pairs". Index by piece minus Knight (0..=3).
const SAME_PAIR_BONUS: [Pair; 4] = [
    Pair::new(-8, -8),  // knight pair (clumsy)
    Pair::new(15, 15),  // bishop pair
    Pair::new(0, 0),    // rook pair
    Pair::new(0, 0),    // queen pair (practically never happens)
];

#[inline(always)]
pub fn mirror_vert(sq: u8) -> usize {
    (sq ^ 56) as usize
}

#[inline(always)]
fn chebyshev_distance(a: Square, b: Square) -> i32 {
    (a.rank() as i32 - b.rank() as i32)
        .abs()
        .max((a.file() as i32 - b.file() as i32).abs())
}

// King-distance bonus: reward minor/major pieces standing closer to the
// enemy king, tapered down toward the endgame where defenders scatter.
fn king_distance_bonus(piece: Piece, dist: i32) -> Pair {
    let weight = match piece {
        Piece::Knight | Piece::Bishop => 2,
        Piece::Rook => 1,
        Piece::Queen => 3,
        _ => 0,
    };
    Pair::new(weight * (7 - dist), 0)
}

const FILE_A: u64 = 0x0101_0101_0101_0101;
const FILE_H: u64 = 0x8080_8080_8080_8080;

/// Per-color, per-square pawn-structure classification, recomputed from the
/// pawn bitboards and cached by `pawn_hash`. See 4.4.1: two passes, the
/// first builds per-file frontmost-rank arrays (`ranks`, sentinel files 0
/// and 9) plus `attacked_by_pawn`, the second classifies doubled/isolated/
/// backwards/passed pawns from those.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PawnStruct {
    /// `ranks[color][file]`: most-advanced pawn's rank on that file for
    /// `color`, `None` if the file (or sentinel file 0/9) has no pawn.
    ranks: [[Option<u8>; 10]; 2],
    attacked_by_pawn: [u64; 2],
    doubled: [u64; 2],
    isolated: [u64; 2],
    backwards: [u64; 2],
    passed: [u64; 2],
}

impl PawnStruct {
    pub fn compute(board: &Board) -> Self {
        let mut ps = PawnStruct::default();
        let wp = board.pieces(Piece::Pawn, Color::White);
        let bp = board.pieces(Piece::Pawn, Color::Black);

        // Pass 1: frontmost rank per file, and attacked-by-pawn union.
        let mut iter = wp;
        while iter != 0 {
            let sq = pop_lsb(&mut iter);
            let file = (sq % 8) as usize + 1;
            let rank = (sq / 8) as u8;
            let slot = &mut ps.ranks[Color::White as usize][file];
            *slot = Some(slot.map_or(rank, |r| r.max(rank)));
            ps.attacked_by_pawn[Color::White as usize] |=
                crate::moves::pawn::pawn_attacks(sq, Color::White);
        }
        let mut iter = bp;
        while iter != 0 {
            let sq = pop_lsb(&mut iter);
            let file = (sq % 8) as usize + 1;
            let rank = (sq / 8) as u8;
            let slot = &mut ps.ranks[Color::Black as usize][file];
            *slot = Some(slot.map_or(rank, |r| r.min(rank)));
            ps.attacked_by_pawn[Color::Black as usize] |=
                crate::moves::pawn::pawn_attacks(sq, Color::Black);
        }

        // Pass 2: doubled / isolated / backwards / passed.
        for (color, pawns) in [(Color::White, wp), (Color::Black, bp)] {
            let ci = color as usize;
            let mut iter = pawns;
            while iter != 0 {
                let sq = pop_lsb(&mut iter);
                let bit = 1u64 << sq;
                let file = (sq % 8) as usize + 1;
                let rank = (sq / 8) as u8;
                let front = ps.ranks[ci][file];
                let left = ps.ranks[ci][file - 1];
                let right = ps.ranks[ci][file + 1];

                let more_advanced = match color {
                    Color::White => front.is_some_and(|r| r > rank),
                    Color::Black => front.is_some_and(|r| r < rank),
                };
                if more_advanced {
                    ps.doubled[ci] |= bit;
                }

                if left.is_none() && right.is_none() {
                    ps.isolated[ci] |= bit;
                } else {
                    let neighbor_edge = match color {
                        Color::White => [left, right].into_iter().flatten().min(),
                        Color::Black => [left, right].into_iter().flatten().max(),
                    };
                    let is_backwards = match (color, neighbor_edge) {
                        (Color::White, Some(edge)) => rank < edge,
                        (Color::Black, Some(edge)) => rank > edge,
                        _ => false,
                    };
                    if is_backwards {
                        ps.backwards[ci] |= bit;
                    }
                }
            }
        }

        // Passed pawns via a front-span cone, same bitboard technique
        // regardless of color's direction.
        let mut iter = wp;
        while iter != 0 {
            let sq = pop_lsb(&mut iter);
            let file = (sq % 8) as u64;
            let rank = sq / 8;
            let front_mask = if rank < 7 { !((1u64 << ((rank + 1) * 8)) - 1) } else { 0 };
            let mut file_mask = FILE_A << file;
            if file > 0 {
                file_mask |= FILE_A << (file - 1);
            }
            if file < 7 {
                file_mask |= FILE_A << (file + 1);
            }
            if (bp & file_mask & front_mask) == 0 {
                ps.passed[Color::White as usize] |= 1u64 << sq;
            }
        }
        let mut iter = bp;
        while iter != 0 {
            let sq = pop_lsb(&mut iter);
            let file = (sq % 8) as u64;
            let rank = sq / 8;
            let front_mask = if rank > 0 { (1u64 << (rank * 8)) - 1 } else { 0 };
            let mut file_mask = FILE_A << file;
            if file > 0 {
                file_mask |= FILE_A << (file - 1);
            }
            if file < 7 {
                file_mask |= FILE_A << (file + 1);
            }
            if (wp & file_mask & front_mask) == 0 {
                ps.passed[Color::Black as usize] |= 1u64 << sq;
            }
        }

        ps
    }

    #[inline]
    fn attacked_by(&self, color: Color) -> u64 {
        self.attacked_by_pawn[color as usize]
    }

    /// Squares a minor piece of `color` (the side being attacked) would be
    /// unsafe to sit on, accounting for the opponent's pawns' current and
    /// one-step-advance-then-diagonal attack squares.
    fn unsafe_for_minor(&self, color: Color) -> u64 {
        let attacker = color.opposite();
        let current = self.attacked_by(attacker);
        let advance = match attacker {
            Color::White => current << 8,
            Color::Black => current >> 8,
        };
        current | advance
    }
}

const PAWN_CACHE_BITS: u32 = 13;
const PAWN_CACHE_SIZE: usize = 1 << PAWN_CACHE_BITS;
const PAWN_CACHE_MASK: u32 = (PAWN_CACHE_SIZE as u32) - 1;

thread_local! {
    static PAWN_CACHE: RefCell<Vec<Option<(u32, PawnStruct)>>> =
        RefCell::new(vec![None; PAWN_CACHE_SIZE]);
}

fn pawn_struct_cached(board: &Board) -> PawnStruct {
    let key = board.pawn_hash();
    let idx = (key & PAWN_CACHE_MASK) as usize;
    PAWN_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some((k, ps)) = cache[idx]
            && k == key
        {
            return ps;
        }
        let ps = PawnStruct::compute(board);
        cache[idx] = Some((key, ps));
        ps
    })
}

/// Lazy first look: only the incremental piece-square running sum, no
/// positional terms. `FastEval(pos) -> score` per 4.4.
pub fn fast_eval(board: &Board) -> i32 {
    let stage = board.stage();
    let raw = board.score[board.side_to_move as usize] - board.score[board.side_to_move.opposite() as usize];
    (dot_product(raw, stage) / (2 * 32) as i64) as i32
}

/// Full static evaluation from the side-to-move's perspective, with the
/// lazy `FastEval` cutoff folded in (4.4 points 1-6).
pub fn static_eval(board: &Board, tables: &MagicTables, alpha: i32, beta: i32) -> i32 {
    let side = board.side_to_move;
    let opp = side.opposite();

    let fast = fast_eval(board);
    if fast < alpha - LAZY_MARGIN {
        return alpha;
    }
    if fast > beta + LAZY_MARGIN {
        return beta;
    }

    let ps = pawn_struct_cached(board);

    let mut score = board.score[side as usize] - board.score[opp as usize];
    score += eval_side(board, tables, side, &ps) - eval_side(board, tables, opp, &ps);
    score += Pair::new(TEMPO_BONUS.mid, TEMPO_BONUS.end);

    let stage = board.stage();
    let mut e = (dot_product(score, stage) / (2 * 32) as i64) as i32;

    // Material-draw scaling: the side ahead has no pawns and too little
    // material to realistically force mate.
    let leader = if e >= 0 { side } else { opp };
    if board.pieces(Piece::Pawn, leader) == 0 && board.mat_index[leader as usize] < 5 {
        return 0;
    }

    // Fifty-move scaling.
    let fifty = board.halfmove_clock.min(100) as i32;
    e = e * (100 - fifty) / 100;

    e
}

fn eval_side(board: &Board, tables: &MagicTables, color: Color, ps: &PawnStruct) -> Pair {
    let mut score = Pair::ZERO;
    let enemy = color.opposite();
    let enemy_king = board.king_square(enemy);
    let occupied = board.occupancy(Color::White) | board.occupancy(Color::Black);
    let us_bb = board.occupancy(color);

    score += eval_pawns(board, color, ps);

    for &piece in &[Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
        let mut bb = board.pieces(piece, color);
        while bb != 0 {
            let sq = pop_lsb(&mut bb);
            let from = Square::from_index(sq as u8);
            let attacks = match piece {
                Piece::Knight => crate::moves::magic::get_knight_attacks(sq as usize),
                Piece::Bishop => tables.bishop.get_attacks(sq as usize, occupied),
                Piece::Rook => tables.rook.get_attacks(sq as usize, occupied),
                Piece::Queen => {
                    tables.bishop.get_attacks(sq as usize, occupied)
                        | tables.rook.get_attacks(sq as usize, occupied)
                }
                _ => 0,
            };

            let mobility_area = !us_bb & !ps.unsafe_for_minor(color);
            let mobility_count = (attacks & mobility_area).count_ones() as i32;
            score += Pair::new(
                MOBILITY_WEIGHT[piece as usize] * mobility_count,
                MOBILITY_WEIGHT[piece as usize] * mobility_count,
            );

            let king_zone = crate::moves::magic::get_king_attacks(enemy_king.index() as usize)
                | enemy_king.bb();
            if attacks & king_zone != 0 {
                score += Pair::new(10, 4);
            }

            let stronger_targets = board.occupancy(enemy) & attacks;
            let mut targets = stronger_targets;
            while targets != 0 {
                let tsq = pop_lsb(&mut targets);
                if let Some((_, target_piece)) = board.piece_at(Square::from_index(tsq as u8))
                    && target_piece != Piece::Pawn
                    && attacker_value(target_piece) > attacker_value(piece)
                {
                    score += Pair::new(ATTACK_STRONGER_PIECE_BONUS, ATTACK_STRONGER_PIECE_BONUS);
                }
            }

            let dist = chebyshev_distance(from, enemy_king);
            score += king_distance_bonus(piece, dist);

            if piece == Piece::Rook {
                score += eval_rook_file(board, color, from);
            }
        }
    }

    score += eval_king_safety(board, tables, color);
    score += eval_piece_pairs(board, color);

    score
}

fn attacker_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 100,
        Piece::Knight => 320,
        Piece::Bishop => 330,
        Piece::Rook => 500,
        Piece::Queen => 900,
        Piece::King => 20000,
    }
}

fn eval_pawns(board: &Board, color: Color, ps: &PawnStruct) -> Pair {
    let ci = color as usize;
    let mut score = Pair::ZERO;
    let mut pawns = board.pieces(Piece::Pawn, color);
    while pawns != 0 {
        let sq = pop_lsb(&mut pawns) as u8;
        let bit = 1u64 << sq;
        let rank = Square::from_index(sq).rank();
        let table_rank = match color {
            Color::White => rank,
            Color::Black => 7 - rank,
        };

        if ps.doubled[ci] & bit != 0 {
            score += DOUBLED_PENALTY;
        }
        if ps.isolated[ci] & bit != 0 {
            score += ISOLATED_PENALTY;
        }
        if ps.backwards[ci] & bit != 0 {
            score += BACKWARDS_PENALTY;
        }
        if ps.passed[ci] & bit != 0 {
            score += PASSED_PAWN_BONUS[table_rank as usize];
        }
    }
    score
}

fn eval_rook_file(board: &Board, color: Color, from: Square) -> Pair {
    let file = from.file() as u64;
    let file_mask = FILE_A << file;
    let own_pawns = board.pieces(Piece::Pawn, color);
    let enemy_pawns = board.pieces(Piece::Pawn, color.opposite());

    let mut score = Pair::ZERO;
    if own_pawns & file_mask == 0 {
        if enemy_pawns & file_mask == 0 {
            score += ROOK_OPEN_FILE_BONUS;
        } else {
            score += ROOK_SEMI_OPEN_FILE_BONUS;
        }
    }

    let seventh = match color {
        Color::White => 6,
        Color::Black => 1,
    };
    if from.rank() == seventh {
        score += ROOK_7TH_RANK_BONUS;
    }
    score
}

fn eval_king_safety(board: &Board, tables: &MagicTables, color: Color) -> Pair {
    let king = board.king_square(color);
    let king_file = king.file() as i32;
    let own_pawns = board.pieces(Piece::Pawn, color);
    let enemy_pawns = board.pieces(Piece::Pawn, color.opposite());

    let mut shield = 0;
    let mut storm = 0;
    for file in (king_file - 1)..=(king_file + 1) {
        if !(0..8).contains(&file) {
            continue;
        }
        let file_mask = FILE_A << file;

        let own_on_file = own_pawns & file_mask;
        if own_on_file != 0 {
            let rank = if color == Color::White {
                (own_on_file.trailing_zeros() / 8) as i32
            } else {
                (63 - own_on_file.leading_zeros()) as i32 / 8
            };
            let advancement = match color {
                Color::White => rank,
                Color::Black => 7 - rank,
            };
            shield += (8 - advancement).max(0);
        }

        let enemy_on_file = enemy_pawns & file_mask;
        if enemy_on_file != 0 {
            let rank = if color == Color::White {
                (63 - enemy_on_file.leading_zeros()) as i32 / 8
            } else {
                (enemy_on_file.trailing_zeros() / 8) as i32
            };
            let advancement = match color {
                Color::White => 7 - rank,
                Color::Black => rank,
            };
            storm += (8 - advancement).max(0);
        }
    }

    let occupied = board.occupancy(Color::White) | board.occupancy(Color::Black);
    let virtual_queen = tables.bishop.get_attacks(king.index() as usize, occupied)
        | tables.rook.get_attacks(king.index() as usize, occupied);
    let exposure = virtual_queen.count_ones() as usize;
    let exposed_penalty = KING_EXPOSED_PENALTY[exposure.min(KING_EXPOSED_PENALTY.len() - 1)];

    Pair::new(
        shield * KING_SHIELD_BONUS_PER_RANK - storm * KING_STORM_PENALTY_PER_RANK - exposed_penalty,
        -exposed_penalty / 2,
    )
}

fn eval_piece_pairs(board: &Board, color: Color) -> Pair {
    let mut score = Pair::ZERO;
    for (i, &piece) in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen]
        .iter()
        .enumerate()
    {
        let count = board.pieces(piece, color).count_ones();
        if count >= 2 {
            score += SAME_PAIR_BONUS[i];
        }
    }
    score
}

/// Symbolic feature IDs for the tuning interface below.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum FeatureId {
    Tempo = 0,
    PawnIsolated,
    PawnDoubled,
    PawnBackwards,
    BishopPair,
    Count,
}

/// Fills `features` (resized to `FeatureId::Count`) with the side-to-move's
/// minus the opponent's raw counts per feature, such that
/// `DotProduct(weights, features) ~= 2 * Evaluate(pos)` up to the lazy/draw/
/// fifty scalings, for the external weight-tuning collaborator.
pub fn get_features(board: &Board, features: &mut Vec<i32>) {
    features.clear();
    features.resize(FeatureId::Count as usize, 0);

    let side = board.side_to_move;
    let opp = side.opposite();
    let ps = pawn_struct_cached(board);

    features[FeatureId::Tempo as usize] = 1;
    features[FeatureId::PawnIsolated as usize] =
        ps.isolated[side as usize].count_ones() as i32 - ps.isolated[opp as usize].count_ones() as i32;
    features[FeatureId::PawnDoubled as usize] =
        ps.doubled[side as usize].count_ones() as i32 - ps.doubled[opp as usize].count_ones() as i32;
    features[FeatureId::PawnBackwards as usize] = ps.backwards[side as usize].count_ones() as i32
        - ps.backwards[opp as usize].count_ones() as i32;

    let bishop_pair = |c: Color| (board.pieces(Piece::Bishop, c).count_ones() >= 2) as i32;
    features[FeatureId::BishopPair as usize] = bishop_pair(side) - bishop_pair(opp);
}

// Debug helpers kept for perft-style diagnostics and tests below.
pub fn eval_material(board: &Board) -> i32 {
    let stage = board.stage();
    let score = board.score[board.side_to_move as usize]
        - board.score[board.side_to_move.opposite() as usize];
    (dot_product(score, stage) / (2 * 32) as i64) as i32
}

pub fn pesto_eval(board: &Board) -> i32 {
    fast_eval(board)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::magic::loader::load_magic_tables;
    use std::str::FromStr;

    #[test]
    fn test_lazy_eval_matches_full_eval_in_close_positions() {
        let board = Board::from_str("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .expect("Invalid FEN");
        let tables = load_magic_tables();

        let lazy = static_eval(&board, &tables, -1000, 1000);
        let full = static_eval(&board, &tables, -i32::MAX, i32::MAX);

        assert_eq!(
            lazy, full,
            "Lazy eval should equal full eval when no cutoff occurs"
        );
    }

    #[test]
    fn test_lazy_beta_cutoff() {
        let board = Board::from_str("4k3/8/8/8/8/8/QQQQQQQQ/4K3 w - - 0 1").expect("Invalid FEN");
        let tables = load_magic_tables();

        let beta = 100;
        let score = static_eval(&board, &tables, -i32::MAX, beta);

        assert!(
            score >= beta,
            "Should trigger cutoff and return a winning score"
        );
    }

    #[test]
    fn test_mirror_symmetry() {
        let board = Board::from_str("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3")
            .expect("Invalid FEN");
        let tables = load_magic_tables();

        let white_eval = static_eval(&board, &tables, -i32::MAX, i32::MAX);
        let mirrored = board.mirror();
        let mirrored_eval = static_eval(&mirrored, &tables, -i32::MAX, i32::MAX);

        assert_eq!(
            white_eval, mirrored_eval,
            "Evaluation must be invariant under Board::mirror()"
        );
    }

    #[test]
    fn test_king_shield_bonus() {
        let tables = load_magic_tables();
        let safe = Board::from_str("rnbq1rk1/pppp1ppp/8/8/8/8/PPP1PPPP/RNBQKB1R w KQ - 0 1")
            .expect("Invalid Safe FEN");
        let unsafe_board = Board::from_str("rnbq1rk1/pppp1ppp/8/8/8/8/8/RNBQKB1R w KQ - 0 1")
            .expect("Invalid Unsafe FEN");

        let s1 = static_eval(&safe, &tables, -10000, 10000);
        let s2 = static_eval(&unsafe_board, &tables, -10000, 10000);

        assert!(
            s1 > s2,
            "Safe king ({}) should score higher than naked king ({})",
            s1,
            s2
        );
    }

    #[test]
    fn test_pawn_struct_detects_doubled_isolated_passed() {
        // White: isolated pawn on a2, doubled pawns on e2/e3, passed pawn on h6.
        let board = Board::from_str("4k3/8/7P/8/8/4P3/P3P3/4K3 w - - 0 1").expect("Invalid FEN");
        let ps = PawnStruct::compute(&board);

        let a2 = Square::from_rank_file(1, 0).index() as u64;
        let e2 = Square::from_rank_file(1, 4).index() as u64;
        let e3 = Square::from_rank_file(2, 4).index() as u64;
        let h6 = Square::from_rank_file(5, 7).index() as u64;

        assert!(ps.isolated[Color::White as usize] & (1 << a2) != 0);
        assert!(ps.doubled[Color::White as usize] & (1 << e2) != 0);
        assert!(ps.doubled[Color::White as usize] & (1 << e3) == 0);
        assert!(ps.passed[Color::White as usize] & (1 << h6) != 0);
    }

    #[test]
    fn test_get_features_tempo_is_set() {
        let board = Board::from_str("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .expect("Invalid FEN");
        let mut features = Vec::new();
        get_features(&board, &mut features);
        assert_eq!(features[FeatureId::Tempo as usize], 1);
        assert_eq!(features.len(), FeatureId::Count as usize);
    }
}
