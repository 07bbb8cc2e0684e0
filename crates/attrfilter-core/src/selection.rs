//! Element selection
//!
//! `DefaultAttributeElementsSelectionHandler` holds a single selection.
//! `DefaultStagedAttributeElementsSelectionHandler` keeps a working copy
//! the user edits and a committed copy the filter is built from.

use crate::callbacks::{
    new_correlation, CallbackPayload, CallbackRegistry, Correlation, Unsubscribe,
};
use crate::lock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::debug;

/// Selected element keys.
///
/// When `is_inverted` is set, `items` lists the excluded keys; otherwise
/// the included ones. Inverted with no items selects everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeElementSelection {
    /// Element keys (uris or values)
    pub items: Vec<String>,
    /// Whether `items` are excluded rather than included
    pub is_inverted: bool,
}

impl AttributeElementSelection {
    /// Build a selection, dropping repeated keys but keeping first-seen order.
    pub fn new<I, S>(items: I, is_inverted: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let items = items
            .into_iter()
            .map(Into::into)
            .filter(|key: &String| seen.insert(key.clone()))
            .collect();
        Self { items, is_inverted }
    }

    /// Select everything.
    #[must_use]
    pub fn all() -> Self {
        Self {
            items: Vec::new(),
            is_inverted: true,
        }
    }

    /// Whether this selection selects everything.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.is_inverted && self.items.is_empty()
    }

    /// Whether this selection selects nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.is_inverted && self.items.is_empty()
    }

    /// Same items with the inversion flipped.
    #[must_use]
    pub fn inverted(&self) -> Self {
        Self {
            items: self.items.clone(),
            is_inverted: !self.is_inverted,
        }
    }
}

impl Default for AttributeElementSelection {
    fn default() -> Self {
        Self::all()
    }
}

/// Holds one selection.
#[derive(Debug, Clone, Default)]
pub struct DefaultAttributeElementsSelectionHandler {
    selection: AttributeElementSelection,
}

impl DefaultAttributeElementsSelectionHandler {
    /// Create a handler holding `selection`.
    #[must_use]
    pub fn new(selection: AttributeElementSelection) -> Self {
        Self { selection }
    }

    /// Replace the selection.
    pub fn change_selection(&mut self, selection: AttributeElementSelection) {
        self.selection = selection;
    }

    /// Flip `is_inverted`, keeping the items.
    pub fn invert_selection(&mut self) {
        self.selection.is_inverted = !self.selection.is_inverted;
    }

    /// Reset to select-all.
    pub fn clear_selection(&mut self) {
        self.selection = AttributeElementSelection::all();
    }

    /// Current selection.
    #[must_use]
    pub fn get_selection(&self) -> &AttributeElementSelection {
        &self.selection
    }
}

struct Stages {
    working: DefaultAttributeElementsSelectionHandler,
    committed: DefaultAttributeElementsSelectionHandler,
}

/// Working/committed selection pair.
///
/// Edits go to the working selection and fire `on_selection_changed`.
/// `commit_selection` publishes the working selection; `revert_selection`
/// throws the uncommitted edits away.
pub struct DefaultStagedAttributeElementsSelectionHandler {
    stages: Mutex<Stages>,
    on_changed: CallbackRegistry<AttributeElementSelection>,
    on_committed: CallbackRegistry<AttributeElementSelection>,
}

impl DefaultStagedAttributeElementsSelectionHandler {
    /// Create a handler with both stages seeded with `initial`.
    #[must_use]
    pub fn new(initial: AttributeElementSelection) -> Self {
        Self {
            stages: Mutex::new(Stages {
                working: DefaultAttributeElementsSelectionHandler::new(initial.clone()),
                committed: DefaultAttributeElementsSelectionHandler::new(initial),
            }),
            on_changed: CallbackRegistry::new(),
            on_committed: CallbackRegistry::new(),
        }
    }

    fn update_working<F>(&self, correlation: Option<Correlation>, update: F)
    where
        F: FnOnce(&mut DefaultAttributeElementsSelectionHandler),
    {
        let selection = {
            let mut stages = lock(&self.stages);
            update(&mut stages.working);
            stages.working.get_selection().clone()
        };
        debug!(
            items = selection.items.len(),
            is_inverted = selection.is_inverted,
            "Working selection changed"
        );
        self.on_changed
            .trigger_all(Some(correlation.unwrap_or_else(new_correlation)), selection);
    }

    /// Replace the working selection.
    pub fn change_selection(
        &self,
        selection: AttributeElementSelection,
        correlation: Option<Correlation>,
    ) {
        self.update_working(correlation, |working| working.change_selection(selection));
    }

    /// Flip the inversion of the working selection.
    pub fn invert_selection(&self, correlation: Option<Correlation>) {
        self.update_working(
            correlation,
            DefaultAttributeElementsSelectionHandler::invert_selection,
        );
    }

    /// Reset the working selection to select-all.
    pub fn clear_selection(&self, correlation: Option<Correlation>) {
        self.update_working(correlation, DefaultAttributeElementsSelectionHandler::clear_selection);
    }

    /// Copy the working selection into the committed one.
    pub fn commit_selection(&self, correlation: Option<Correlation>) {
        let selection = {
            let mut stages = lock(&self.stages);
            stages.committed = stages.working.clone();
            stages.committed.get_selection().clone()
        };
        debug!(items = selection.items.len(), "Selection committed");
        self.on_committed
            .trigger_all(Some(correlation.unwrap_or_else(new_correlation)), selection);
    }

    /// Copy the committed selection back into the working one.
    pub fn revert_selection(&self, correlation: Option<Correlation>) {
        let selection = {
            let mut stages = lock(&self.stages);
            stages.working = stages.committed.clone();
            stages.working.get_selection().clone()
        };
        debug!("Working selection reverted");
        self.on_changed
            .trigger_all(Some(correlation.unwrap_or_else(new_correlation)), selection);
    }

    /// Current working selection.
    #[must_use]
    pub fn get_working_selection(&self) -> AttributeElementSelection {
        lock(&self.stages).working.get_selection().clone()
    }

    /// Current committed selection.
    #[must_use]
    pub fn get_committed_selection(&self) -> AttributeElementSelection {
        lock(&self.stages).committed.get_selection().clone()
    }

    /// Whether the working selection differs from the committed one.
    #[must_use]
    pub fn is_working_selection_changed(&self) -> bool {
        let stages = lock(&self.stages);
        stages.working.get_selection() != stages.committed.get_selection()
    }

    /// Whether the working selection selects nothing.
    #[must_use]
    pub fn is_working_selection_empty(&self) -> bool {
        lock(&self.stages).working.get_selection().is_empty()
    }

    /// Subscribe to working selection changes, reverts included.
    pub fn on_selection_changed<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<AttributeElementSelection>) + Send + Sync + 'static,
    {
        self.on_changed.subscribe(callback)
    }

    /// Subscribe to commits.
    pub fn on_selection_committed<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<AttributeElementSelection>) + Send + Sync + 'static,
    {
        self.on_committed.subscribe(callback)
    }
}

impl Default for DefaultStagedAttributeElementsSelectionHandler {
    fn default() -> Self {
        Self::new(AttributeElementSelection::all())
    }
}
