pub mod filter;
pub mod storage;
pub mod types;

pub use filter::{filter_reviewed, filter_unreviewed};
pub use storage::{load_review_state, save_review_state};
pub use types::{defer_until, ReviewDecision, ReviewState, Verdict};
