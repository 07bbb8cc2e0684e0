//! Attrfilter Backend - Analytical Backend SPI
//!
//! This crate defines what the attribute filter handler needs from an
//! analytical backend:
//! - `AnalyticalBackend`: async trait for display form and elements queries
//! - `ElementsQuery`: builder describing one elements page request
//! - `InMemoryBackend`: fixture-driven implementation for demos and tests
//!
//! # Example
//!
//! ```ignore
//! use attrfilter_backend::{AnalyticalBackend, ElementsQuery};
//!
//! let query = ElementsQuery::for_display_form(display_form)
//!     .with_limit(50)
//!     .with_offset(0);
//! let page = backend.query_elements("workspace", query).await?;
//! println!("{} of {}", page.items.len(), page.total_count);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod memory;
pub mod query;

pub use backend::AnalyticalBackend;
#[cfg(any(test, feature = "mock"))]
pub use backend::MockAnalyticalBackend;
pub use error::{BackendError, Result};
pub use memory::{BackendFixture, DisplayFormFixture, InMemoryBackend};
pub use query::{ElementsQuery, ElementsQueryOptions, ElementsQueryResult};
