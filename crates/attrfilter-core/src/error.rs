//! Error types for attrfilter-core

use attrfilter_backend::BackendError;
use std::time::Duration;
use thiserror::Error;

/// Error type for attribute filter loads and contract violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Backend call failed or was aborted
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Load did not finish within the configured timeout
    #[error("load timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid combination of load options (raised at call time)
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// No async runtime available to run the load
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl FilterError {
    /// Whether this error is a cancellation rather than a genuine failure.
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_abort())
    }

    pub(crate) fn aborted() -> Self {
        Self::Backend(BackendError::Aborted)
    }
}

/// Result type for attribute filter operations
pub type Result<T> = std::result::Result<T, FilterError>;
