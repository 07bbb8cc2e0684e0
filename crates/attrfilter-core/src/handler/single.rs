//! Single-select handler

use super::{AttributeFilterHandler, AttributeFilterHandlerConfig, HandlerCore};
use crate::callbacks::{CallbackPayload, Correlation, Unsubscribe};
use crate::error::Result;
use crate::selection::AttributeElementSelection;
use attrfilter_model::{AttributeElement, AttributeElements, AttributeFilter};
use tracing::warn;

/// Keep at most the first element of `filter`.
///
/// A single-select filter cannot carry more than one element; extra
/// elements are dropped with a warning. Polarity and key kind are kept.
#[must_use]
pub fn sanitize_single_select_filter(filter: &AttributeFilter) -> AttributeFilter {
    let elements = filter.elements();
    if elements.keys().len() <= 1 {
        return filter.clone();
    }
    warn!(
        display_form = %filter.display_form(),
        dropped = elements.keys().len() - 1,
        "Single-select filter has several elements, keeping the first"
    );
    let first = elements.keys()[..1].to_vec();
    filter.with_elements(AttributeElements::from_keys(elements.key_kind(), first))
}

fn first_key(selection: &AttributeElementSelection) -> Option<String> {
    selection.items.first().cloned()
}

/// Handler of a filter selecting at most one element.
pub struct SingleSelectAttributeFilterHandler {
    core: HandlerCore,
}

impl SingleSelectAttributeFilterHandler {
    /// Create the handler and start its init loads.
    pub fn new(mut config: AttributeFilterHandlerConfig) -> Result<Self> {
        config.filter = sanitize_single_select_filter(&config.filter);
        Ok(Self {
            core: HandlerCore::new(config)?,
        })
    }

    /// Select `key`, or nothing when `None`.
    pub fn change_selection(&self, key: Option<String>, correlation: Option<Correlation>) {
        let selection = AttributeElementSelection::new(key, false);
        self.core.selection.change_selection(selection, correlation);
    }

    /// Key of the working selection.
    #[must_use]
    pub fn get_working_selection(&self) -> Option<String> {
        first_key(&self.core.selection.get_working_selection())
    }

    /// Key of the committed selection.
    #[must_use]
    pub fn get_committed_selection(&self) -> Option<String> {
        first_key(&self.core.selection.get_committed_selection())
    }

    /// Element of the working selection, if selected and loaded.
    #[must_use]
    pub fn get_selected_item(&self) -> Option<AttributeElement> {
        let selection = self.core.selection.get_working_selection();
        self.core.resolve(&selection).elements.into_iter().next().flatten()
    }

    /// Subscribe to working selection changes.
    pub fn on_selection_changed<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<Option<String>>) + Send + Sync + 'static,
    {
        self.core
            .selection
            .on_selection_changed(move |payload| callback(&payload.map(first_key)))
    }

    /// Subscribe to commits.
    pub fn on_selection_committed<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<Option<String>>) + Send + Sync + 'static,
    {
        self.core
            .selection
            .on_selection_committed(move |payload| callback(&payload.map(first_key)))
    }
}

impl AttributeFilterHandler for SingleSelectAttributeFilterHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }
}
