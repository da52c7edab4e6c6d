//! Lazy-SMP helper thread pool.
//!
//! Thread 0 is the caller (the main thread driving iterative deepening
//! directly via `search::iterative_deepening`). `ThreadPool` manages the
//! helpers, threads 1..N, each running its own iterative deepening from
//! depth `1 + id` on a private `Board`/`SearchContext`, sharing only the
//! transposition table. Each helper is a small state machine — NEW -> SLEEP
//! <-> WORK -> QUIT — driven by a mutex/condvar pair, matching 4.6.6.

use crate::board::Board;
use crate::moves::magic::MagicTables;
use crate::search::context::SearchContext;
use crate::search::search::{TimeManager, iterative_deepening};
use crate::search::tt::TranspositionTable;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

pub const MAX_NUM_THREADS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThreadState {
    Sleep,
    Work,
    Quit,
}

struct Job {
    board: Board,
    tables: MagicTables,
    max_depth: i32,
}

/// A raw pointer to the shared TT. Helper threads probe/record through this
/// without locking, exactly as the transposition table's own contract
/// promises: the 32-bit lock plus the legality check on every move reject
/// any torn entry a race might produce.
struct SharedTt(*mut TranspositionTable);

unsafe impl Send for SharedTt {}
unsafe impl Sync for SharedTt {}

impl SharedTt {
    /// # Safety
    /// The pointee must outlive every `HelperThread` holding a clone of this
    /// handle; `ThreadPool::join_all` (called from `Drop`) upholds that by
    /// construction since threads never outlive the pool.
    unsafe fn get(&self) -> &mut TranspositionTable {
        unsafe { &mut *self.0 }
    }
}

struct ThreadShared {
    state: Mutex<ThreadState>,
    cv: Condvar,
    job: Mutex<Option<Job>>,
    stop: Arc<AtomicBool>,
}

struct HelperThread {
    shared: Arc<ThreadShared>,
    handle: Option<JoinHandle<()>>,
}

impl HelperThread {
    fn spawn(id: usize, tt: SharedTt) -> Self {
        let shared = Arc::new(ThreadShared {
            state: Mutex::new(ThreadState::Sleep),
            cv: Condvar::new(),
            job: Mutex::new(None),
            stop: Arc::new(AtomicBool::new(false)),
        });
        let worker_shared = Arc::clone(&shared);

        let handle = std::thread::spawn(move || {
            loop {
                let job = {
                    let mut state = worker_shared.state.lock().unwrap();
                    while *state == ThreadState::Sleep {
                        state = worker_shared.cv.wait(state).unwrap();
                    }
                    if *state == ThreadState::Quit {
                        return;
                    }
                    worker_shared.job.lock().unwrap().take()
                };

                if let Some(Job {
                    mut board,
                    tables,
                    max_depth,
                }) = job
                {
                    worker_shared.stop.store(false, Ordering::Relaxed);
                    let mut ctx = SearchContext::new();
                    let mut time =
                        TimeManager::new(None).with_external_stop(Arc::clone(&worker_shared.stop));
                    let tt_ref = unsafe { tt.get() };

                    iterative_deepening(
                        &mut board,
                        &tables,
                        &mut ctx,
                        tt_ref,
                        &mut time,
                        1 + id as i32,
                        max_depth,
                        1,
                        None,
                        |_info| {}, // helpers never report; thread 0 owns output
                    );
                }

                let mut state = worker_shared.state.lock().unwrap();
                if *state == ThreadState::Work {
                    *state = ThreadState::Sleep;
                }
            }
        });

        Self {
            shared,
            handle: Some(handle),
        }
    }

    fn work(&self, board: Board, tables: MagicTables, max_depth: i32) {
        *self.shared.job.lock().unwrap() = Some(Job {
            board,
            tables,
            max_depth,
        });
        *self.shared.state.lock().unwrap() = ThreadState::Work;
        self.shared.cv.notify_one();
    }

    fn stop(&self) {
        self.shared.stop.store(true, Ordering::Relaxed);
        let mut state = self.shared.state.lock().unwrap();
        if *state == ThreadState::Work {
            *state = ThreadState::Sleep;
        }
    }

    fn quit(&mut self) {
        *self.shared.state.lock().unwrap() = ThreadState::Quit;
        self.shared.cv.notify_one();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Owns the helper threads (1..N) for lazy-SMP search. The main thread
/// (thread 0) is the caller and is never represented here.
pub struct ThreadPool {
    helpers: Vec<HelperThread>,
    tt: SharedTt,
}

impl ThreadPool {
    /// `num_threads` is the total thread count including the main thread, so
    /// `num_threads - 1` helpers are spawned (clamped to `MAX_NUM_THREADS`).
    pub fn new(num_threads: usize, tt: &mut TranspositionTable) -> Self {
        let helper_count = num_threads.saturating_sub(1).min(MAX_NUM_THREADS - 1);
        let tt = SharedTt(tt as *mut TranspositionTable);
        let helpers = (0..helper_count)
            .map(|id| HelperThread::spawn(id + 1, SharedTt(tt.0)))
            .collect();

        Self { helpers, tt }
    }

    pub fn num_helpers(&self) -> usize {
        self.helpers.len()
    }

    /// Starts every helper searching `board` to `max_depth` from its own
    /// depth offset, sharing only the transposition table this pool was
    /// built with.
    pub fn start(&self, board: &Board, tables: &MagicTables, max_depth: i32) {
        for helper in &self.helpers {
            helper.work(board.clone(), tables.clone(), max_depth);
        }
    }

    /// Signals every helper back to SLEEP, aborting in-progress search at
    /// the next poll point.
    pub fn stop_all(&self) {
        for helper in &self.helpers {
            helper.stop();
        }
    }

    /// # Safety
    /// Exposed so `Engine` can probe the same table the helpers write to
    /// while they're asleep. Calling this while helpers are in WORK is the
    /// same lock-free, possibly-torn read their own probes perform.
    pub unsafe fn shared_tt(&self) -> &mut TranspositionTable {
        unsafe { self.tt.get() }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        for helper in &mut self.helpers {
            helper.quit();
        }
    }
}
