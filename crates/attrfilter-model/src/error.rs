//! Error types for attrfilter-model

use thiserror::Error;

/// Error type for model construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// An object reference string could not be parsed
    #[error("invalid object reference: {0}")]
    InvalidRef(String),

    /// A relative date filter range is reversed
    #[error("invalid date range: from {from} is after to {to}")]
    InvalidDateRange {
        /// Start offset
        from: i32,
        /// End offset
        to: i32,
    },
}

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;
