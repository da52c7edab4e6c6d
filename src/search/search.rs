use crate::board::{Board, Color, Piece};
use crate::moves::execute::{make_move_basic, make_null_move, undo_move_basic, undo_null_move};
use crate::moves::magic::MagicTables;
use crate::moves::square_control::in_check;
use crate::moves::types::Move;
use crate::search::context::SearchContext;
use crate::search::eval::static_eval;
use crate::search::picker::MovePicker;
use crate::search::see::SeeExt;
use crate::search::tt::{NodeType, TranspositionTable};
use std::time::{Duration, Instant};

const INF: i32 = 32000;
const MATE_SCORE: i32 = 31000;
const MATE_THRESHOLD: i32 = MATE_SCORE - 1000; // 30000 - buffer for mate distance
const MAX_Q_SEARCH_DEPTH: usize = 100;
const DRAW_SCORE: i32 = 0;
// Bounded by the per-ply tables (killers, history, refutations) SearchContext
// allocates at construction.
const MAX_PLY: usize = 64;

// --- Tuning Constants ---

// Reverse Futility Pruning (RFP)
const RFP_DEPTH_LIMIT: i32 = 9;
const RFP_MARGIN_BASE: i32 = 80;
const RFP_MARGIN_MULT: i32 = 90;

// Futility Pruning (FP)
const FP_DEPTH_LIMIT: i32 = 7;
const FP_MARGIN_BASE: i32 = 100;
const FP_MARGIN_MULT: i32 = 100;
// Success-rate scale is 0..=100 (see `SearchContext::history_score`).
const FP_HISTORY_THRESHOLD: i32 = 50;

// Late Move Pruning (LMP)
const LMP_DEPTH_LIMIT: i32 = 14;
const LMP_BASE_MOVES: i32 = 3;
const LMP_MOVE_MULTIPLIER: i32 = 6;

// Late Move Reduction (LMR)
const LMR_MIN_DEPTH: i32 = 2;
const LMR_MIN_MOVES: i32 = 4;
// const LMR_BASE: f64 = 0.75;
// const LMR_DIVISOR: f64 = 2.5;

// --- TT Score Adjustment Helpers ---
fn score_to_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

fn score_from_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}
// -----------------------------------

/// Tracks the soft/hard time budget for one search. `soft` bounds whether
/// another iterative-deepening iteration is worth starting; `hard` is the
/// point at which in-progress search is aborted outright.
pub struct TimeManager {
    pub start_time: Instant,
    pub soft: Option<Duration>,
    pub hard: Option<Duration>,
    pub stop_signal: bool,
    /// Lets an owner outside the search thread (the thread pool's `Stop()`)
    /// request an abort at the next poll point.
    external_stop: Option<std::sync::Arc<std::sync::atomic::AtomicBool>>,
    /// Polled every 8192 nodes on the main thread so a command console can
    /// interrupt search on `stop`/`?`/`undo`/`isready` without this module
    /// knowing anything about command parsing. Helper threads never set
    /// this, so the polling is naturally main-thread-only.
    stdin_poll: Option<Box<dyn FnMut() -> bool + Send>>,
}

impl TimeManager {
    /// A single fixed move-time limit, used as both the soft and hard budget.
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start_time: Instant::now(),
            soft: limit,
            hard: limit,
            stop_signal: false,
            external_stop: None,
            stdin_poll: None,
        }
    }

    /// Derives soft/hard budgets from the clock, per `maxTimeSoft =
    /// restTime / 40` and `maxTimeHard = restTime / 2`. `rest_moves` and
    /// `increment` are accepted for future refinement but don't enter the
    /// formula, matching the source this is modeled on.
    pub fn with_budgets(rest_time: Duration, _rest_moves: u32, _increment: Duration) -> Self {
        Self {
            start_time: Instant::now(),
            soft: Some(rest_time / 40),
            hard: Some(rest_time / 2),
            stop_signal: false,
            external_stop: None,
            stdin_poll: None,
        }
    }

    /// Attaches a callback polled every 8192 nodes; returning `true` aborts
    /// the search at the next poll point. A console-driven UI uses this to
    /// check stdin for `stop`/`?`/`undo`/`isready` without this module
    /// parsing commands itself.
    pub fn with_stdin_poll(mut self, poll: impl FnMut() -> bool + Send + 'static) -> Self {
        self.stdin_poll = Some(Box::new(poll));
        self
    }

    /// Attaches a flag a thread pool can flip to request cancellation
    /// without tearing down the soft/hard budget logic above.
    pub fn with_external_stop(mut self, flag: std::sync::Arc<std::sync::atomic::AtomicBool>) -> Self {
        self.external_stop = Some(flag);
        self
    }

    #[inline(always)]
    pub fn check_time(&mut self) {
        if self.stop_signal {
            return;
        }

        if let Some(flag) = &self.external_stop
            && flag.load(std::sync::atomic::Ordering::Relaxed)
        {
            self.stop_signal = true;
            return;
        }

        if let Some(hard) = self.hard
            && self.start_time.elapsed() >= hard
        {
            self.stop_signal = true;
        }
    }

    /// Runs the attached stdin-poll callback, if any. No-op (and cheap) on
    /// helper threads, which never attach one.
    #[inline(always)]
    pub fn poll_stdin(&mut self) {
        if self.stop_signal {
            return;
        }
        if let Some(poll) = &mut self.stdin_poll
            && poll()
        {
            self.stop_signal = true;
        }
    }

    /// Returns the soft time budget, used to decide whether another
    /// iteration is worth starting.
    #[inline(always)]
    pub fn allocated_time(&self) -> Option<Duration> {
        self.soft
    }

    /// Returns elapsed time since search started
    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[allow(clippy::too_many_arguments, clippy::only_used_in_recursion)]
pub fn quiescence(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
) -> i32 {
    // SAFETY BRAKE: Prevent Q-search explosions
    if ply > MAX_Q_SEARCH_DEPTH {
        return static_eval(board, tables, alpha, beta);
    }

    let stand_pat = static_eval(board, tables, alpha, beta);

    if stand_pat >= beta {
        return beta;
    }
    if stand_pat >= alpha {
        alpha = stand_pat;
    }

    // Use MovePicker in captures-only mode for quiescence
    let mut picker = MovePicker::new(None, [None, None], None, None, true);

    while let Some(mv) = picker.next(board, tables, ctx) {
        *nodes += 1;
        if *nodes & 63 == 0 {
            time.check_time();
        }
        if time.stop_signal {
            return stand_pat;
        }

        let mut captured_value = 0;
        if let Some(piece) = board.piece_type_at(mv.to) {
            captured_value = piece.value();
        }

        // DELTA PRUNING SAFETY
        // Don't prune if it's a promotion (potentially huge value)
        // Don't prune if it's En Passant (captured_value is 0, but it captures a pawn)
        let is_prom = mv.is_promotion();
        let is_ep = mv.is_en_passant();

        // "Blindness" Fix: Only prune standard captures.
        if !is_prom && !is_ep && stand_pat + captured_value + 200 < alpha {
            continue;
        }

        // SEE Pruning: Skip captures that lose material
        // Note: MovePicker already filters bad captures for us, but we keep this
        // for promotions and en passant which bypass SEE classification
        if !is_prom && !is_ep && !board.static_exchange_eval(mv, 0, tables) {
            continue;
        }

        let undo = make_move_basic(board, mv);
        let score = -quiescence(board, tables, ctx, tt, ply + 1, -beta, -alpha, nodes, time);
        undo_move_basic(board, undo);

        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }
    alpha
}

/// Counts legal replies up to `cap`, used only to detect the sole-legal-reply
/// extension case. Cheap relative to a full search node: it reuses the same
/// staged `MovePicker`/legality-check path the move loop itself uses.
fn count_legal_replies_capped(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &SearchContext,
    cap: usize,
) -> usize {
    let mut picker = MovePicker::new(None, [None, None], None, None, false);
    let mut count = 0;
    while count < cap && picker.next(board, tables, ctx).is_some() {
        count += 1;
    }
    count
}

#[allow(clippy::too_many_arguments, clippy::only_used_in_recursion)]
pub fn alpha_beta(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    depth: i32,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
    root_depth: i32,
    excluded: Option<&[Move]>,
) -> (i32, Option<Move>) {
    // Check every 1024 nodes instead of 2047 for tighter control
    if *nodes & 63 == 0 {
        time.check_time();
    }

    if time.stop_signal {
        return (0, None);
    }
    *nodes += 1;
    ctx.sel_depth = ctx.sel_depth.max(ply);

    if *nodes & 8191 == 0 {
        time.poll_stdin();
    }

    if ply >= MAX_PLY {
        return (alpha, None);
    }

    // 2. Repetition & TT Probing (Standard)
    if ply > 0 && board.is_repetition() {
        return (DRAW_SCORE, None);
    }
    if ply > 0 && board.halfmove_clock >= 100 {
        return (DRAW_SCORE, None);
    }

    // Mate-distance pruning: no line through this node can beat a mate
    // already found closer to the root.
    if alpha >= MATE_SCORE - ply as i32 {
        return (alpha, None);
    }

    if time.stop_signal {
        return (0, None);
    }

    let hash = board.hash();
    let mut hash_move = None;

    // TT PROBE WITH MATE SCORE ADJUSTMENT
    if let Some((tt_move, raw_score, tt_depth, tt_bound)) =
        tt.probe(hash, depth as u8, alpha, beta, ply as i32)
    {
        if let Some(tm) = tt_move {
            hash_move = Some(tm);
        }

        if tt_depth >= depth as u8 {
            // Convert the stored independent score back to relative score
            let tt_score = score_from_tt(raw_score, ply as i32);

            if ply > 0 {
                match tt_bound {
                    0 => return (tt_score, tt_move),
                    1 if tt_score >= beta => return (tt_score, tt_move),
                    2 if tt_score <= alpha => return (tt_score, tt_move),
                    _ => {}
                }
            }
        }
    }

    let in_check_now = in_check(board, board.side_to_move, tables);

    // FIX 6: CHECK EXTENSION
    // If we are in check, extend the search by 1 ply.
    // This resolves forced mates and prevents the horizon effect.
    let extension = if in_check_now { 1 } else { 0 };

    if depth <= 0 && !in_check_now {
        let score = quiescence(board, tables, ctx, tt, ply, alpha, beta, nodes, time);
        return (score, None);
    }

    // [STEP 1] Calculate Eval Early
    // We lift this out so both RFP and SFP can share it.
    let static_eval_val = if !in_check_now {
        static_eval(board, tables, alpha, beta)
    } else {
        0 // Dummy value, we won't use it if in check
    };

    // [STEP 2] Update Reverse Futility Pruning (RFP) to use the variable
    if depth < RFP_DEPTH_LIMIT && !in_check_now && ply > 0 {
        let margin = RFP_MARGIN_BASE + RFP_MARGIN_MULT * depth;
        if static_eval_val - margin >= beta {
            return (beta, None);
        }
    }
    // =============================================================

    // =============================================================
    // 1. NULL MOVE PRUNING (Tuned)
    // =============================================================
    if depth >= 4
        && !in_check_now
        // REMOVED: && (beta - alpha == 1) <--- Unlocks NMP for PV nodes (Massive speedup)
        && board.has_major_pieces(board.side_to_move)
        && static_eval_val >= beta
    // Only null move if we are already winning statically
    {
        // Dynamic Reduction: If deep, reduce more.
        let r = if depth > 6 { 3 } else { 2 };

        let undo = make_null_move(board);

        // Scout search with Null Window
        let (val, _) = alpha_beta(
            board,
            tables,
            ctx,
            tt,
            depth - r - 1,
            ply + 1,
            -beta,
            -beta + 1,
            nodes,
            time,
            root_depth,
            None,
        );
        let score = -val;
        undo_null_move(board, undo);

        if score >= beta && !time.stop_signal {
            // Verification search for high depths (Optional safety)
            if score >= MATE_THRESHOLD {
                // Don't trust null move mates, search normally
            } else {
                return (beta, None);
            }
        }
    }

    // INTERNAL ITERATIVE DEEPENING: no TT move to order with, and deep
    // enough that a shallow re-search to find one pays for itself.
    if hash_move.is_none() && depth > 4 {
        let (_, iid_move) = alpha_beta(
            board, tables, ctx, tt, depth - 4, ply, alpha, beta, nodes, time, root_depth, None,
        );
        hash_move = iid_move;
        if time.stop_signal {
            return (0, None);
        }
    }

    // Use MovePicker for staged move generation
    let mate_killer = ctx.mate_killers[ply];
    let refutation = ctx.current_refutation(ply, board.side_to_move);
    let mut picker = MovePicker::new(hash_move, ctx.killer_moves[ply], mate_killer, refutation, false);

    // SINGLE-REPLY DETECTION: counted up front since it changes the
    // extension decision for the (only) move about to be tried.
    let sole_reply = count_legal_replies_capped(board, tables, ctx, 2) == 1;

    let mut best_move = None;
    let mut best_score = -INF;
    let original_alpha = alpha;
    let mut move_count = 0;

    while let Some(mv) = picker.next(board, tables, ctx) {
        // Root move exclusion (multipv): skip PVs already reported at this
        // depth so the next iteration of the multipv loop finds a different
        // one.
        if ply == 0
            && let Some(excl) = excluded
            && excl.contains(&mv)
        {
            continue;
        }

        // [STEP 3] OPTIMIZED FUTILITY PRUNING
        // Logic: If the move is quiet and our position is hopelessly below Alpha, skip it.
        if depth < FP_DEPTH_LIMIT
            && !in_check_now
            && !mv.is_capture()
            && !mv.is_promotion()
            && move_count > 0
        {
            let margin = FP_MARGIN_BASE + FP_MARGIN_MULT * depth;

            // HISTORY PROTECTION (The Optimization):
            // We retrieve the history success rate for this move.
            let history = ctx.history_score(mv, board.side_to_move);

            // If the move has a high success rate, it has been good in other nodes.
            // We should NOT prune it, even if static eval says it's bad.
            if history < FP_HISTORY_THRESHOLD && static_eval_val + margin <= alpha {
                continue; // PRUNE: Skip to next move
            }
        }

        // =========================================================
        // LATE MOVE PRUNING (LMP)
        // =========================================================
        // Logic: If we have searched many quiet moves and haven't found a
        // good one yet, it's highly unlikely the remaining (unsorted) moves
        // will be any better. Just cut them off.
        if depth < LMP_DEPTH_LIMIT
            && !in_check_now
            && !mv.is_capture()
            && !mv.is_promotion()
            && alpha == original_alpha
        {
            let lmp_threshold = LMP_BASE_MOVES + LMP_MOVE_MULTIPLIER * depth;
            if move_count > lmp_threshold as usize {
                break;
            }
        }
        // =========================================================

        if !mv.is_capture() {
            ctx.note_quiet_tried(mv, board.side_to_move);
        }
        ctx.last_move[ply + 1] = Some(mv);

        // Extensions beyond the unconditional check extension: pawn push to
        // the 7th rank, recapture of the square the last move captured on,
        // and the sole-legal-reply case. At most one applies, and only while
        // this line hasn't already run deeper than the current iteration
        // would justify.
        let within_extension_budget = ply as i32 + depth <= 2 * root_depth;
        let mut bonus_extension = 0;
        if within_extension_budget {
            let pawn_to_7th = mv.piece == Piece::Pawn
                && match board.side_to_move {
                    Color::White => mv.to.rank() == 6,
                    Color::Black => mv.to.rank() == 1,
                };
            let recapture = mv.is_capture()
                && ctx.last_move[ply].is_some_and(|last| last.is_capture() && last.to == mv.to);

            if pawn_to_7th || recapture || sole_reply {
                bonus_extension = 1;
            }
        }
        let move_extension = extension + bonus_extension;

        let undo = make_move_basic(board, mv);
        let mut score;

        if move_count == 0 {
            let (val, _) = alpha_beta(
                board,
                tables,
                ctx,
                tt,
                depth - 1 + move_extension,
                ply + 1,
                -beta,
                -alpha,
                nodes,
                time,
                root_depth,
                None,
            );
            score = -val;
        } else {
            // =========================================================
            // 2. LATE MOVE REDUCTION (Tuned: Soft Formula)
            // =========================================================
            let mut r = 0;
            if depth > LMR_MIN_DEPTH
                && move_count > LMR_MIN_MOVES as usize
                && !mv.is_capture()
                && !mv.is_promotion()
                && !in_check_now
            // Don't reduce if we are escaping check!
            {
                // OLD (Suicidal): 1 + (depth / 3) + (move_count / 10)

                // NEW (Standard):
                // 1. Base reduction
                r = 1 + (depth / 8) + (move_count as i32 / 20);

                // 2. History Safety (Keep this, it's good)
                let history = ctx.history_score(mv, board.side_to_move);
                if history > FP_HISTORY_THRESHOLD {
                    r -= 1; // Trust history
                }

                // 3. PV Node Safety
                // If we are in a PV node (open window), reduce less
                if beta - alpha > 1 {
                    r -= 1;
                }

                // Clamp
                if r < 0 {
                    r = 0;
                }
                if r > depth - 2 {
                    r = depth - 2;
                } // Leave at least depth 1
            }

            // Perform the Reduced Search (Zero Window)
            let (val, _) = alpha_beta(
                board,
                tables,
                ctx,
                tt,
                depth - 1 + move_extension - r,
                ply + 1,
                -alpha - 1,
                -alpha,
                nodes,
                time,
                root_depth,
                None,
            );
            score = -val;

            // Re-search if the reduced search found a surprisingly good move
            if score > alpha && r > 0 {
                let (val, _) = alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth - 1 + move_extension,
                    ply + 1,
                    -alpha - 1,
                    -alpha,
                    nodes,
                    time,
                    root_depth,
                    None,
                );
                score = -val;
            }

            if score > alpha && score < beta {
                let (val, _) = alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth - 1 + move_extension,
                    ply + 1,
                    -beta,
                    -alpha,
                    nodes,
                    time,
                    root_depth,
                    None,
                );
                score = -val;
            }
        }

        undo_move_basic(board, undo);
        move_count += 1;

        if time.stop_signal {
            return (0, None);
        }

        if score > best_score {
            best_score = score;
            if score > alpha {
                alpha = score;
                best_move = Some(mv);
            }
            if score >= beta {
                // TT SAVE WITH MATE SCORE ADJUSTMENT (LowerBound/Beta Cutoff)
                let tt_score = score_to_tt(beta, ply as i32);
                tt.save(
                    hash,
                    Some(mv),
                    tt_score,
                    depth as u8,
                    NodeType::LowerBound as u8,
                    ply as i32,
                );

                if !mv.is_capture() {
                    if beta >= MATE_THRESHOLD {
                        ctx.update_mate_killer(ply, mv);
                    }
                    ctx.update_killer(ply, mv);
                    ctx.update_history(mv, board.side_to_move, depth);

                    if let Some(last) = ctx.last_move[ply] {
                        let last_code = crate::search::context::piece_code(
                            board.side_to_move.opposite(),
                            last.piece,
                        );
                        ctx.update_refutation(ply, last.to.index() as usize, last_code, mv);
                    }
                }

                return (beta, Some(mv));
            }
        }
    }

    // No legal moves found - checkmate or stalemate
    if move_count == 0 {
        if in_check_now {
            return (-MATE_SCORE + ply as i32, None);
        }
        return (0, None);
    }

    if time.stop_signal {
        return (0, None);
    }

    let node_type = if best_score >= beta {
        NodeType::LowerBound
    } else if best_score > original_alpha {
        NodeType::Exact
    } else {
        NodeType::UpperBound
    };

    // TT SAVE WITH MATE SCORE ADJUSTMENT (Best Score)
    // We save 'best_score' (which is alpha if exact, or the best failed low score if UpperBound)
    let tt_score = score_to_tt(best_score, ply as i32);
    tt.save(
        hash,
        best_move,
        tt_score,
        depth as u8,
        node_type as u8,
        ply as i32,
    );

    (best_score, best_move)
}

/// One completed (or aborted) iteration of iterative deepening, handed to
/// the caller's report callback instead of being printed directly.
pub struct IterationInfo {
    pub depth: i32,
    pub score: i32,
    pub nodes: u64,
    pub elapsed: Duration,
    pub best_move: Option<Move>,
    /// 1-based PV index within this depth; always 1 unless `multipv > 1`.
    pub multipv_index: u32,
}

/// Runs iterative deepening from `start_depth` to `max_depth` against a
/// caller-owned TT and time budget, reporting each completed iteration
/// through `report` rather than writing to stdout directly. Helper search
/// threads reuse this with their own `start_depth` and a private
/// `SearchContext`/`Board`, sharing only `tt`, and pass `multipv = 1` and
/// `max_knps = None` since only the main thread drives output and strength
/// throttling. Returns the score/move of PV1 regardless of `multipv`.
#[allow(clippy::too_many_arguments)]
pub fn iterative_deepening(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    time: &mut TimeManager,
    start_depth: i32,
    max_depth: i32,
    multipv: u32,
    max_knps: Option<u32>,
    mut report: impl FnMut(IterationInfo),
) -> (i32, Option<Move>) {
    let mut last_completed_best_move = None;
    let mut last_completed_best_score = 0;
    let mut nodes = 0;
    let mut last_iter_duration = Duration::from_millis(0);
    let multipv = multipv.max(1);

    // "The root has exactly one legal move": a stop condition for the whole
    // driver, checked once up front since it can't change across depths.
    let root_single_move = count_legal_replies_capped(board, tables, ctx, 2) == 1;

    for depth in start_depth..=max_depth {
        let iter_start = Instant::now();

        // --- ITERATIVE DEEPENING SAFETY CHECK ---
        // Predict if we can afford the next depth before starting it.
        // Conservative estimate: Next depth takes ~3x longer than previous.
        // (Using 3x instead of 2x because branching factor can spike in tactical positions)
        if depth > 1
            && let Some(limit) = time.allocated_time()
        {
            let total_elapsed = time.elapsed();
            let predicted_next = last_iter_duration * 3;

            // If predicting the next depth would push us over the limit: STOP.
            if total_elapsed + predicted_next > limit {
                break;
            }
        }
        // -----------------------------------------

        ctx.age_history();

        let mut excluded_roots: Vec<Move> = Vec::new();
        let mut pv1_score = last_completed_best_score;
        let mut pv1_move = last_completed_best_move;
        let mut depth_completed = false;

        for pv_index in 0..multipv {
            // --- Aspiration Window Logic ---
            let mut alpha = -INF;
            let mut beta = INF;
            let window = 50; // Window size (50cp)

            // Only apply aspiration windows at depth > 4 for stability
            if depth > 4 && pv_index == 0 {
                alpha = last_completed_best_score - window;
                beta = last_completed_best_score + window;
            }

            let mut score;
            let mut mv;

            loop {
                // Perform the search with the current window
                let result = alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth,
                    0,
                    alpha,
                    beta,
                    &mut nodes,
                    time,
                    depth,
                    Some(excluded_roots.as_slice()),
                );

                score = result.0;
                mv = result.1;

                // If we ran out of time during the search, stop immediately
                if time.stop_signal {
                    break;
                }

                // 1. Fail Low (Score <= Alpha): Position is worse than expected.
                // Only widen alpha downwards. Keep beta unchanged for stability.
                if score <= alpha {
                    alpha = -INF;
                    continue;
                }

                // 2. Fail High (Score >= Beta): Position is better than expected.
                // Only widen beta upwards. Keep alpha unchanged for stability.
                if score >= beta {
                    beta = INF;
                    continue;
                }

                // 3. Success: Score is within the window.
                break;
            }
            // -------------------------------

            if time.stop_signal {
                break;
            }

            if pv_index == 0 {
                pv1_score = score;
                pv1_move = mv;
            }
            if let Some(m) = mv {
                excluded_roots.push(m);
            }
            depth_completed = true;

            report(IterationInfo {
                depth,
                score,
                nodes,
                elapsed: time.elapsed(),
                best_move: mv,
                multipv_index: pv_index + 1,
            });

            // No further PV to exclude against if this PV already covered
            // every legal root move.
            if mv.is_none() {
                break;
            }
        }

        // Record duration for the NEXT prediction check
        last_iter_duration = iter_start.elapsed();

        // CRITICAL FIX: If the stop signal was triggered, DO NOT update the best move.
        // The search at this depth is incomplete and likely contains blunders.
        if time.stop_signal || !depth_completed {
            break;
        }

        // Only update if the depth actually finished
        last_completed_best_score = pv1_score;
        last_completed_best_move = pv1_move;

        // Strength limiter: pace wall-clock to the configured node budget
        // instead of running at full native speed.
        if let Some(knps) = max_knps
            && knps > 0
        {
            let expected = Duration::from_secs_f64(nodes as f64 / (knps as f64 * 1000.0));
            let actual = time.elapsed();
            if expected > actual {
                std::thread::sleep(expected - actual);
            }
        }

        // Optimization: If we found a mate, stop searching deeper
        if pv1_score.abs() >= MATE_THRESHOLD {
            break;
        }

        if root_single_move {
            break;
        }
    }

    (last_completed_best_score, last_completed_best_move)
}

/// Single-threaded entry point: reuses a caller-owned TT across calls (so a
/// GUI session doesn't discard its hash table between moves) and prints UCI
/// `info` lines to stdout per iteration, matching the original console
/// search driver's behavior.
pub fn search(
    board: &mut Board,
    tables: &MagicTables,
    tt: &mut TranspositionTable,
    max_depth: i32,
    time_limit: Option<Duration>,
) -> (i32, Option<Move>) {
    tt.new_search();
    let mut ctx = SearchContext::new();
    let mut time = TimeManager::new(time_limit);

    iterative_deepening(
        board,
        tables,
        &mut ctx,
        tt,
        &mut time,
        1,
        max_depth,
        1,
        None,
        |info| {
            let score_str = if info.score.abs() >= MATE_THRESHOLD {
                let moves = (MATE_SCORE - info.score.abs() + 1) / 2;
                if info.score > 0 {
                    format!("mate {}", moves)
                } else {
                    format!("mate -{}", moves)
                }
            } else {
                format!("cp {}", info.score)
            };

            if let Some(valid_mv) = info.best_move {
                println!(
                    "info depth {} score {} nodes {} time {} multipv {} pv {}",
                    info.depth,
                    score_str,
                    info.nodes,
                    info.elapsed.as_millis(),
                    info.multipv_index,
                    valid_mv.to_uci()
                );
            }
        },
    )
}
