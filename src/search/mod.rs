pub mod context;
pub mod engine;
pub mod eval;
pub mod ordering;
pub mod pesto;
pub mod picker;
pub mod search;
pub mod see;
pub mod threads;
pub mod tt;

pub use context::SearchContext;
pub use engine::Engine;
pub use search::{TimeManager, alpha_beta, quiescence};
pub use tt::TranspositionTable;
