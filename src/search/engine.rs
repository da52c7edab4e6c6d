//! `Engine` aggregates the transposition table, helper thread pool, and
//! search parameters that the original kept as process-wide statics on a
//! fixed `SearchThread` array. A command layer (out of scope here) would
//! hold exactly one `Engine` per running instance.

use crate::board::Board;
use crate::moves::magic::MagicTables;
use crate::search::context::SearchContext;
use crate::search::search::{IterationInfo, TimeManager, iterative_deepening};
use crate::search::threads::ThreadPool;
use crate::search::tt::TranspositionTable;
use crate::moves::types::Move;
use std::time::Duration;

/// Configuration for one search: depth/node/time limits plus the knobs the
/// original's `SearchParams` struct exposes. No external config-file crate
/// is pulled in for this — it's a plain struct with a `Default` impl.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub max_depth: i32,
    pub max_nodes: Option<u64>,
    pub max_time_soft: Duration,
    pub max_time_hard: Duration,
    pub multipv: u32,
    /// Nodes-per-second throttle; `None` disables the strength limiter.
    pub max_knps: Option<u32>,
    pub num_threads: usize,
    pub hash_size_mb: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_nodes: None,
            max_time_soft: Duration::from_millis(2000),
            max_time_hard: Duration::from_millis(2000),
            multipv: 1,
            max_knps: None,
            num_threads: 1,
            hash_size_mb: 64,
        }
    }
}

/// Owns the TT, the helper pool, and search parameters for one running
/// instance.
///
/// `ThreadPool` shares `tt` with its helpers through a raw pointer rather
/// than an `Arc`, matching the lock-free TT contract in the concurrency
/// model this follows. That means an `Engine` must not be moved (e.g. out
/// of a `Box`, into a `Vec`, or by value into another binding) while its
/// pool is alive — doing so would leave the helpers holding a pointer into
/// the old location. In practice, build one `Engine` and keep it in place
/// for the life of the process, as the original does with its static
/// `SearchThread` array.
pub struct Engine {
    pub tt: TranspositionTable,
    pub params: SearchParams,
    pool: Option<ThreadPool>,
}

impl Engine {
    pub fn new(params: SearchParams) -> Self {
        Self {
            tt: TranspositionTable::new(params.hash_size_mb),
            params,
            pool: None,
        }
    }

    /// Runs iterative deepening on `board` for this engine's configured
    /// depth/time budget, starting any configured helper threads first and
    /// stopping them once the main thread's search completes.
    pub fn search(
        &mut self,
        board: &mut Board,
        tables: &MagicTables,
        mut report: impl FnMut(IterationInfo),
    ) -> (i32, Option<Move>) {
        self.tt.new_search();

        let pool = ThreadPool::new(self.params.num_threads, &mut self.tt);
        if pool.num_helpers() > 0 {
            pool.start(board, tables, self.params.max_depth);
        }

        let mut ctx = SearchContext::new();
        let mut time = TimeManager::new(None);
        time.soft = Some(self.params.max_time_soft);
        time.hard = Some(self.params.max_time_hard);

        let result = iterative_deepening(
            board,
            tables,
            &mut ctx,
            &mut self.tt,
            &mut time,
            1,
            self.params.max_depth,
            self.params.multipv,
            self.params.max_knps,
            &mut report,
        );

        pool.stop_all();
        self.pool = Some(pool);

        result
    }
}
