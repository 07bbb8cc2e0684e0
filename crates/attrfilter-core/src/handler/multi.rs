//! Multi-select handler

use super::{
    AttributeElementSelectionFull, AttributeFilterHandler, AttributeFilterHandlerConfig,
    HandlerCore,
};
use crate::callbacks::{CallbackPayload, Correlation, Unsubscribe};
use crate::error::Result;
use crate::selection::AttributeElementSelection;

/// Handler of a filter selecting any set of elements, or all but a set.
pub struct MultiSelectAttributeFilterHandler {
    core: HandlerCore,
}

impl MultiSelectAttributeFilterHandler {
    /// Create the handler and start its init loads.
    pub fn new(config: AttributeFilterHandlerConfig) -> Result<Self> {
        Ok(Self {
            core: HandlerCore::new(config)?,
        })
    }

    /// Replace the working selection.
    pub fn change_selection(
        &self,
        selection: AttributeElementSelection,
        correlation: Option<Correlation>,
    ) {
        self.core.selection.change_selection(selection, correlation);
    }

    /// Flip the inversion of the working selection.
    pub fn invert_selection(&self, correlation: Option<Correlation>) {
        self.core.selection.invert_selection(correlation);
    }

    /// Reset the working selection to select-all.
    pub fn clear_selection(&self, correlation: Option<Correlation>) {
        self.core.selection.clear_selection(correlation);
    }

    /// Current working selection.
    #[must_use]
    pub fn get_working_selection(&self) -> AttributeElementSelection {
        self.core.selection.get_working_selection()
    }

    /// Current committed selection.
    #[must_use]
    pub fn get_committed_selection(&self) -> AttributeElementSelection {
        self.core.selection.get_committed_selection()
    }

    /// Working selection resolved through the element dictionary.
    #[must_use]
    pub fn get_selected_items(&self) -> AttributeElementSelectionFull {
        self.core.resolve(&self.core.selection.get_working_selection())
    }

    /// Subscribe to working selection changes.
    pub fn on_selection_changed<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<AttributeElementSelection>) + Send + Sync + 'static,
    {
        self.core.selection.on_selection_changed(callback)
    }

    /// Subscribe to commits.
    pub fn on_selection_committed<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<AttributeElementSelection>) + Send + Sync + 'static,
    {
        self.core.selection.on_selection_committed(callback)
    }
}

impl AttributeFilterHandler for MultiSelectAttributeFilterHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }
}
