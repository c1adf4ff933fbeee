//! Search-level errors shared by the two pathfinders.

use thiserror::Error;

/// A search that failed for a reason other than "no path exists". No-path is
/// not an error at this level; it is reported as `Ok(None)` so a candidate
/// profile can simply be skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The caller's cancel token fired mid-search.
    #[error("search cancelled")]
    Cancelled,

    /// The iteration budget ran out before the goal was reached. Surfaced
    /// distinctly so a budget hit is never mistaken for a disconnected graph.
    #[error("search budget exhausted after {pops} pops (cap {cap})")]
    BudgetExhausted { cap: usize, pops: usize },
}
