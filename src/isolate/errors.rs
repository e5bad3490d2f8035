//! Isolate error types
//!
//! Lifecycle failures carry their own codes. Failures inside a plan request
//! keep the code of the subsystem that raised them.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::encoder::EncodeError;
use crate::planner::PlannerError;

/// Result type for isolate operations
pub type IsolateResult<T> = Result<T, IsolateError>;

/// Isolate lifecycle and plan invocation errors
#[derive(Debug, Clone, Error)]
pub enum IsolateError {
    #[error("Isolate limit of {limit} reached")]
    Exhausted { limit: usize },

    #[error("Isolate {0} is unknown or has been released")]
    Stale(u64),

    #[error("Invalid plan request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Catalog(#[from] CatalogError),

    #[error("{0}")]
    Planner(#[from] PlannerError),

    #[error("{0}")]
    Encode(#[from] EncodeError),
}

impl IsolateError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            IsolateError::Exhausted { .. } => "AETHRA_ISOLATE_EXHAUSTED",
            IsolateError::Stale(_) => "AETHRA_ISOLATE_STALE",
            IsolateError::InvalidRequest(_) => "AETHRA_REQUEST_INVALID",
            IsolateError::Catalog(e) => e.code().code(),
            IsolateError::Planner(e) => e.code().code(),
            IsolateError::Encode(e) => e.code().code(),
        }
    }

    /// Human-readable message without the code prefix
    pub fn message(&self) -> String {
        match self {
            IsolateError::Catalog(e) => e.message().to_string(),
            IsolateError::Planner(e) => e.message().to_string(),
            IsolateError::Encode(e) => format!("{}: {}", e.operator(), e.message()),
            other => other.to_string(),
        }
    }
}
