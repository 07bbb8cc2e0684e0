//! Attrfilter Core - Attribute Filter Handler
//!
//! This crate provides the state machine behind an attribute filter dropdown:
//! - `DefaultAttributeDisplayFormLoader`: loads display form metadata
//! - `DefaultAttributeElementsLoader`: pages, searches and caches elements
//! - `DefaultStagedAttributeElementsSelectionHandler`: working vs committed selection
//! - `SingleSelectAttributeFilterHandler` / `MultiSelectAttributeFilterHandler`:
//!   orchestrators composing the above
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  MultiSelect / SingleSelect AttributeFilterHandler          │
//! │  ├─ DisplayFormLoader  ──► DisplayFormLoad ──┐              │
//! │  ├─ ElementsLoader     ──► ElementsLoad ─────┤              │
//! │  └─ StagedSelection (working / committed)    │              │
//! └──────────────────────────────────────────────┼──────────────┘
//!                                                ▼
//!                                     AnalyticalBackend (SPI)
//! ```
//!
//! Every load runs as a tokio task and reports through typed callback
//! channels tagged with a correlation. Starting a load of the same kind
//! cancels the previous one, so the latest request always wins.
//!
//! # Example
//!
//! ```ignore
//! use attrfilter_core::{AttributeFilterHandler, AttributeFilterHandlerConfig,
//!     MultiSelectAttributeFilterHandler};
//!
//! let handler = MultiSelectAttributeFilterHandler::new(
//!     AttributeFilterHandlerConfig::new(backend, "workspace", filter),
//! )?;
//! handler.wait_for_init().await;
//! handler.load_elements_range(0, 50, None)?.await?;
//! for element in handler.get_all_items() {
//!     println!("{}", element.title.unwrap_or_default());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod callbacks;
pub mod display_form;
pub mod elements;
pub mod error;
pub mod fetch;
pub mod handler;
pub mod loadable;
pub mod selection;
pub mod settings;

#[cfg(test)]
pub(crate) mod testutil;

pub use callbacks::{
    new_correlation, CallbackPayload, CallbackRegistry, Correlation, Unsubscribe, INIT_CORRELATION,
};
pub use display_form::DefaultAttributeDisplayFormLoader;
pub use elements::DefaultAttributeElementsLoader;
pub use error::{FilterError, Result};
pub use fetch::{
    BackendDisplayFormLoad, BackendElementsLoad, DisplayFormLoad, ElementsLoad, ElementsLoadConfig,
    ElementsLoadResult,
};
pub use handler::{
    sanitize_single_select_filter, AttributeElementSelectionFull, AttributeFilterHandler,
    AttributeFilterHandlerConfig, HandlerCore, MultiSelectAttributeFilterHandler,
    SingleSelectAttributeFilterHandler,
};
pub use loadable::{Loadable, LoadableStatus};
pub use selection::{
    AttributeElementSelection, DefaultAttributeElementsSelectionHandler,
    DefaultStagedAttributeElementsSelectionHandler,
};
pub use settings::HandlerSettings;

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the data if a panicking callback poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
