//! Loadable - state of one asynchronously loaded value

use crate::error::FilterError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a loadable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadableStatus {
    /// Never requested
    #[default]
    Pending,
    /// Request in flight
    Loading,
    /// Last request failed
    Error,
    /// Last request succeeded
    Success,
}

impl fmt::Display for LoadableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Loading => write!(f, "loading"),
            Self::Error => write!(f, "error"),
            Self::Success => write!(f, "success"),
        }
    }
}

/// Current state of an asynchronously loaded value.
///
/// Exactly one of result/error exists, and only in the matching status.
#[derive(Debug, Clone, PartialEq)]
pub enum Loadable<T, E = FilterError> {
    /// Never requested
    Pending,
    /// Request in flight
    Loading,
    /// Last request failed
    Error(E),
    /// Last request succeeded
    Success(T),
}

impl<T, E> Default for Loadable<T, E> {
    fn default() -> Self {
        Self::Pending
    }
}

impl<T, E> Loadable<T, E> {
    /// Status of this loadable.
    #[must_use]
    pub fn status(&self) -> LoadableStatus {
        match self {
            Self::Pending => LoadableStatus::Pending,
            Self::Loading => LoadableStatus::Loading,
            Self::Error(_) => LoadableStatus::Error,
            Self::Success(_) => LoadableStatus::Success,
        }
    }

    /// Loaded value, if the last request succeeded.
    #[must_use]
    pub fn result(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Error, if the last request failed.
    #[must_use]
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Whether a request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}
