//! Engine error surface.
//!
//! Every failure a caller can see maps onto one of five kinds: NotFound,
//! InvalidArgument, Unsatisfiable, Corruption, or External. Validation
//! errors surface immediately; nothing here is retried.

use overland_core::SearchError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Unsatisfiable,
    Corruption,
    External,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("terrain bundle '{0}' not found")]
    BundleNotFound(String),

    #[error("terrain bundle '{bundle}' missing required file: {file}")]
    MissingBundleFile { bundle: String, file: String },

    #[error("unknown route ids: {0}")]
    UnknownRoutes(String),

    #[error("missing risk evaluation for: {0}; run evaluate_risk first")]
    MissingRisk(String),

    #[error("missing pace estimates for: {0}; run estimate_pace first")]
    MissingPace(String),

    #[error("no route has been selected; run select first")]
    NoSelection,

    #[error("no viable route found between the provided coordinates")]
    NoViableRoute,

    #[error("no route satisfies the provided constraints: {0}")]
    Unsatisfiable(String),

    #[error("corrupt {file}: {reason}")]
    Corrupt { file: String, reason: String },

    #[error("unsupported archive extension: {0}")]
    UnsupportedArchive(String),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("search cancelled")]
    Cancelled,

    #[error("search budget exhausted after {pops} pops (cap {cap})")]
    SearchBudget { cap: usize, pops: usize },

    #[error("{0}")]
    External(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::BundleNotFound(_) | EngineError::MissingBundleFile { .. } => {
                ErrorKind::NotFound
            }
            EngineError::UnknownRoutes(_)
            | EngineError::MissingRisk(_)
            | EngineError::MissingPace(_)
            | EngineError::NoSelection
            | EngineError::NoViableRoute
            | EngineError::UnsupportedArchive(_)
            | EngineError::InvalidTimestamp(_)
            | EngineError::Cancelled => ErrorKind::InvalidArgument,
            EngineError::Unsatisfiable(_) => ErrorKind::Unsatisfiable,
            EngineError::Corrupt { .. } => ErrorKind::Corruption,
            EngineError::SearchBudget { .. } | EngineError::External(_) | EngineError::Io(_) => {
                ErrorKind::External
            }
        }
    }
}

impl From<SearchError> for EngineError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Cancelled => EngineError::Cancelled,
            SearchError::BudgetExhausted { cap, pops } => EngineError::SearchBudget { cap, pops },
        }
    }
}
