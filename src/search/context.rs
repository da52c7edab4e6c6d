use crate::board::{Color, Piece};
use crate::moves::types::Move;

/// Distinct (color, piece) codes used to index history/refutation tables,
/// matching `Board`'s own `(color << 3) | piece` square-occupant encoding:
/// 0..=5 for White pieces, 8..=13 for Black pieces.
const PIECE_CODES: usize = 14;

#[inline]
pub fn piece_code(color: Color, piece: Piece) -> usize {
    ((color as usize) << 3) | (piece as usize)
}

/// Per-thread move-ordering state: killers, mate-killers, refutations, and
/// the history try/success counters behind the 4.6.3 success-rate score.
pub struct SearchContext {
    pub killer_moves: Vec<[Option<Move>; 2]>,
    /// A killer that previously delivered a mate score at this ply.
    pub mate_killers: Vec<Option<Move>>,
    /// refutations[ply][to][piece_code]: the quiet move that cut off
    /// immediately after the opponent's last move landed on `to` with this
    /// piece, at this ply.
    pub refutations: Vec<[[Option<Move>; PIECE_CODES]; 64]>,
    /// The move that was just played to reach ply `i`, used as the lookup
    /// key into `refutations` at the child node.
    pub last_move: Vec<Option<Move>>,
    /// How many times a quiet move to `to` with mover `piece_code` was tried.
    history_try: [[u32; PIECE_CODES]; 64],
    /// How many of those tries caused a beta cutoff.
    history_success: [[u32; PIECE_CODES]; 64],
    /// Deepest ply reached this search, for UCI `seldepth` reporting.
    pub sel_depth: usize,
}

impl Default for SearchContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchContext {
    pub fn new() -> Self {
        Self {
            killer_moves: vec![[None; 2]; 64],
            mate_killers: vec![None; 64],
            refutations: vec![[[None; PIECE_CODES]; 64]; 64],
            last_move: vec![None; 64],
            history_try: [[0; PIECE_CODES]; 64],
            history_success: [[0; PIECE_CODES]; 64],
            sel_depth: 0,
        }
    }

    pub fn update_killer(&mut self, ply: usize, mv: Move) {
        if self.killer_moves[ply][0] != Some(mv) {
            self.killer_moves[ply][1] = self.killer_moves[ply][0];
            self.killer_moves[ply][0] = Some(mv);
        }
    }

    pub fn update_mate_killer(&mut self, ply: usize, mv: Move) {
        self.mate_killers[ply] = Some(mv);
    }

    pub fn update_refutation(&mut self, ply: usize, last_to: usize, last_piece_code: usize, mv: Move) {
        self.refutations[ply][last_to][last_piece_code] = Some(mv);
    }

    /// Looks up the refutation recorded at `ply` for whatever move is
    /// recorded in `last_move[ply]` (the move the opponent just played),
    /// where `mover_color` is the side that played it.
    pub fn current_refutation(&self, ply: usize, mover_color: Color) -> Option<Move> {
        let last = self.last_move[ply]?;
        let code = piece_code(mover_color, last.piece);
        self.refutations[ply][last.to.index() as usize][code]
    }

    /// Records that a quiet move was tried in the move loop, regardless of
    /// outcome. Call once per quiet move actually searched.
    pub fn note_quiet_tried(&mut self, mv: Move, color: Color) {
        let code = piece_code(color, mv.piece);
        self.history_try[mv.to.index() as usize][code] =
            self.history_try[mv.to.index() as usize][code].saturating_add(1);
    }

    /// Records a beta cutoff for a quiet move, bumping its success count.
    pub fn update_history(&mut self, mv: Move, color: Color, depth: i32) {
        let code = piece_code(color, mv.piece);
        let bonus = (depth.max(0) as u32).min(64);
        self.history_success[mv.to.index() as usize][code] =
            self.history_success[mv.to.index() as usize][code].saturating_add(bonus);
    }

    /// `100 * histSuccess[to][piece] / histTry[to][piece]`, or 0 if never
    /// tried. Matches 4.6.3's "other" ordering tier.
    pub fn history_score(&self, mv: Move, color: Color) -> i32 {
        let code = piece_code(color, mv.piece);
        let to = mv.to.index() as usize;
        let tries = self.history_try[to][code];
        if tries == 0 {
            return 0;
        }
        ((100 * self.history_success[to][code]) / tries) as i32
    }

    /// Halves every history count, used between iterations so stale
    /// statistics from early (shallow) iterations don't dominate later ones.
    pub fn age_history(&mut self) {
        for row_try in self.history_try.iter_mut() {
            for v in row_try.iter_mut() {
                *v /= 2;
            }
        }
        for row_success in self.history_success.iter_mut() {
            for v in row_success.iter_mut() {
                *v /= 2;
            }
        }
    }
}
