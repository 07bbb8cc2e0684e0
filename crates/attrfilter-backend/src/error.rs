//! Error types for attrfilter-backend

use thiserror::Error;

/// Error returned by backend calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The request was aborted before it completed
    #[error("request aborted")]
    Aborted,

    /// Referenced object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Request failed (network, server or protocol error)
    #[error("request failed: {0}")]
    Request(String),

    /// The backend cannot serve this kind of query
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl BackendError {
    /// Whether this error represents a cancellation rather than a failure.
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// Result type for backend calls
pub type Result<T> = std::result::Result<T, BackendError>;
