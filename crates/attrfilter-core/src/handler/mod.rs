//! Attribute filter handlers
//!
//! A handler owns one display form loader, one elements loader and one
//! staged selection, all scoped to a single attribute filter. Construction
//! seeds the selection from the filter and starts the init loads:
//!
//! - display form metadata
//! - titles of the initially selected elements
//! - the total element count
//!
//! The shared surface lives on the [`AttributeFilterHandler`] trait; the
//! single- and multi-select variants add their own selection API.

mod multi;
mod single;

pub use multi::MultiSelectAttributeFilterHandler;
pub use single::{sanitize_single_select_filter, SingleSelectAttributeFilterHandler};

use crate::callbacks::{
    new_correlation, CallbackPayload, Correlation, Unsubscribe, INIT_CORRELATION,
};
use crate::display_form::DefaultAttributeDisplayFormLoader;
use crate::elements::DefaultAttributeElementsLoader;
use crate::error::{FilterError, Result};
use crate::fetch::{
    BackendDisplayFormLoad, BackendElementsLoad, DisplayFormLoad, ElementsLoad, ElementsLoadResult,
};
use crate::loadable::{Loadable, LoadableStatus};
use crate::lock;
use crate::selection::{AttributeElementSelection, DefaultStagedAttributeElementsSelectionHandler};
use crate::settings::HandlerSettings;
use attrfilter_backend::AnalyticalBackend;
use attrfilter_model::{
    AttributeElement, AttributeElements, AttributeFilter, DisplayFormMetadata, ElementKeyKind,
    ElementsQueryAttributeFilter, ElementsSpecification, Measure, ObjRef, RelativeDateFilter,
    SortDirection,
};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Everything a handler is built from.
#[derive(Clone)]
pub struct AttributeFilterHandlerConfig {
    /// Backend to load from
    pub backend: Arc<dyn AnalyticalBackend>,
    /// Workspace id
    pub workspace: String,
    /// Initial filter; decides the display form, key kind and selection
    pub filter: AttributeFilter,
    /// Custom display form fetch; defaults to the backend
    pub display_form_load: Option<Arc<dyn DisplayFormLoad>>,
    /// Custom elements fetch; defaults to the backend
    pub elements_load: Option<Arc<dyn ElementsLoad>>,
    /// Tunables
    pub settings: HandlerSettings,
}

impl fmt::Debug for AttributeFilterHandlerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeFilterHandlerConfig")
            .field("workspace", &self.workspace)
            .field("filter", &self.filter)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AttributeFilterHandlerConfig {
    /// Config with default fetch functions and settings.
    pub fn new(
        backend: Arc<dyn AnalyticalBackend>,
        workspace: impl Into<String>,
        filter: AttributeFilter,
    ) -> Self {
        Self {
            backend,
            workspace: workspace.into(),
            filter,
            display_form_load: None,
            elements_load: None,
            settings: HandlerSettings::default(),
        }
    }

    /// Use a custom display form fetch.
    #[must_use]
    pub fn with_display_form_load(mut self, load: Arc<dyn DisplayFormLoad>) -> Self {
        self.display_form_load = Some(load);
        self
    }

    /// Use a custom elements fetch.
    #[must_use]
    pub fn with_elements_load(mut self, load: Arc<dyn ElementsLoad>) -> Self {
        self.elements_load = Some(load);
        self
    }

    /// Override the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: HandlerSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Working selection with its keys resolved to elements.
///
/// Keys whose elements are not loaded yet resolve to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeElementSelectionFull {
    /// Resolved elements, in selection order
    pub elements: Vec<Option<AttributeElement>>,
    /// Whether the elements are excluded rather than included
    pub is_inverted: bool,
}

fn correlation_or_new(correlation: Option<Correlation>) -> Option<Correlation> {
    Some(correlation.unwrap_or_else(new_correlation))
}

/// State shared by both handler variants.
pub struct HandlerCore {
    display_form: ObjRef,
    key_kind: ElementKeyKind,
    display_form_loader: DefaultAttributeDisplayFormLoader,
    elements_loader: DefaultAttributeElementsLoader,
    selection: DefaultStagedAttributeElementsSelectionHandler,
    init: Mutex<Vec<JoinHandle<()>>>,
}

impl HandlerCore {
    /// Build the loaders and selection from `config` and start the init loads.
    ///
    /// Fails when called outside a tokio runtime or with invalid settings.
    /// Any valid filter is accepted: selections larger than
    /// `particular_elements_limit` are resolved in several loads.
    pub fn new(config: AttributeFilterHandlerConfig) -> Result<Self> {
        let AttributeFilterHandlerConfig {
            backend,
            workspace,
            filter,
            display_form_load,
            elements_load,
            settings,
        } = config;
        settings.validate()?;

        let display_form = filter.display_form().clone();
        let key_kind = filter.elements().key_kind();
        let initial = AttributeElementSelection::new(
            filter.elements().keys().iter().cloned(),
            filter.is_negative(),
        );

        let display_form_loader = DefaultAttributeDisplayFormLoader::new(
            display_form.clone(),
            Arc::clone(&backend),
            workspace.clone(),
            display_form_load.unwrap_or_else(|| Arc::new(BackendDisplayFormLoad)),
            settings.load_timeout(),
        );
        let elements_loader = DefaultAttributeElementsLoader::new(
            display_form.clone(),
            backend,
            workspace.clone(),
            elements_load.unwrap_or_else(|| Arc::new(BackendElementsLoad)),
            key_kind,
            settings,
        );

        let core = Self {
            display_form,
            key_kind,
            display_form_loader,
            elements_loader,
            selection: DefaultStagedAttributeElementsSelectionHandler::new(initial.clone()),
            init: Mutex::new(Vec::new()),
        };

        info!(
            workspace = %workspace,
            display_form = %core.display_form,
            selected = initial.items.len(),
            is_inverted = initial.is_inverted,
            "Initializing attribute filter handler"
        );
        let init_correlation = Some(INIT_CORRELATION.to_string());
        let mut handles = vec![core
            .display_form_loader
            .load_display_form_info(init_correlation.clone())?];
        handles.extend(core.elements_loader.load_particular_elements_in_batches(
            key_kind,
            initial.items,
            init_correlation,
        )?);
        handles.push(core.elements_loader.load_total_count()?);
        *lock(&core.init) = handles;
        Ok(core)
    }

    /// Wait until the init loads have settled.
    pub async fn wait_for_init(&self) {
        let handles: Vec<_> = lock(&self.init).drain(..).collect();
        for result in futures::future::join_all(handles).await {
            if let Err(err) = result {
                warn!(error = %err, "Init load task failed");
            }
        }
    }

    /// Display form loader.
    #[must_use]
    pub fn display_form_loader(&self) -> &DefaultAttributeDisplayFormLoader {
        &self.display_form_loader
    }

    /// Elements loader.
    #[must_use]
    pub fn elements_loader(&self) -> &DefaultAttributeElementsLoader {
        &self.elements_loader
    }

    /// Staged selection.
    #[must_use]
    pub fn selection(&self) -> &DefaultStagedAttributeElementsSelectionHandler {
        &self.selection
    }

    /// Filter built from a selection, keyed the same way as the initial filter.
    #[must_use]
    pub fn filter_for(&self, selection: &AttributeElementSelection) -> AttributeFilter {
        let elements = AttributeElements::from_keys(self.key_kind, selection.items.clone());
        if selection.is_inverted {
            AttributeFilter::negative(self.display_form.clone(), elements)
        } else {
            AttributeFilter::positive(self.display_form.clone(), elements)
        }
    }

    fn resolve(&self, selection: &AttributeElementSelection) -> AttributeElementSelectionFull {
        AttributeElementSelectionFull {
            elements: self.elements_loader.get_items_by_key(&selection.items),
            is_inverted: selection.is_inverted,
        }
    }
}

impl Drop for HandlerCore {
    fn drop(&mut self) {
        self.display_form_loader.cancel_display_form_info_load();
        self.elements_loader.cancel_element_load();
    }
}

/// Operations shared by the single- and multi-select handlers.
///
/// Load methods return the handle of the spawned load; results arrive
/// through the matching callbacks and getters. A missing correlation is
/// replaced by a fresh one.
#[async_trait::async_trait]
pub trait AttributeFilterHandler: Send + Sync {
    /// Shared state.
    fn core(&self) -> &HandlerCore;

    /// Wait until the init loads have settled.
    async fn wait_for_init(&self) {
        self.core().wait_for_init().await;
    }

    /// Reload the display form.
    fn load_display_form_info(&self, correlation: Option<Correlation>) -> Result<JoinHandle<()>> {
        self.core()
            .display_form_loader
            .load_display_form_info(correlation_or_new(correlation))
    }

    /// Cancel the display form load in flight.
    fn cancel_display_form_info_load(&self) {
        self.core().display_form_loader.cancel_display_form_info_load();
    }

    /// Load `limit` elements from `offset` under the current settings.
    fn load_elements_range(
        &self,
        offset: u32,
        limit: u32,
        correlation: Option<Correlation>,
    ) -> Result<JoinHandle<()>> {
        self.core()
            .elements_loader
            .load_elements_range(offset, limit, correlation_or_new(correlation))
    }

    /// Load the page following the loaded items.
    fn load_next_elements_page(&self, correlation: Option<Correlation>) -> Result<JoinHandle<()>> {
        self.core()
            .elements_loader
            .load_next_elements_page(correlation_or_new(correlation))
    }

    /// Load an explicit set of elements into the dictionary.
    fn load_particular_elements(
        &self,
        elements: ElementsSpecification,
        correlation: Option<Correlation>,
    ) -> Result<JoinHandle<()>> {
        self.core()
            .elements_loader
            .load_particular_elements(elements, correlation_or_new(correlation))
    }

    /// Cancel the element loads in flight.
    fn cancel_element_load(&self) {
        self.core().elements_loader.cancel_element_load();
    }

    /// Set the title search; the selection is kept.
    fn set_search(&self, search: &str) {
        self.core().elements_loader.set_search(search);
    }

    /// Set the sort order.
    fn set_order(&self, order: SortDirection) {
        self.core().elements_loader.set_order(order);
    }

    /// Set the limiting measures.
    fn set_limiting_measures(&self, measures: Vec<Measure>) {
        self.core().elements_loader.set_limiting_measures(measures);
    }

    /// Set the parent attribute filters.
    fn set_limiting_attribute_filters(&self, filters: Vec<ElementsQueryAttributeFilter>) {
        self.core().elements_loader.set_limiting_attribute_filters(filters);
    }

    /// Set the limiting date filters.
    fn set_limiting_date_filters(&self, filters: Vec<RelativeDateFilter>) {
        self.core().elements_loader.set_limiting_date_filters(filters);
    }

    /// Publish the working selection.
    fn commit_selection(&self, correlation: Option<Correlation>) {
        self.core().selection.commit_selection(correlation);
    }

    /// Drop uncommitted selection edits.
    fn revert_selection(&self, correlation: Option<Correlation>) {
        self.core().selection.revert_selection(correlation);
    }

    /// Whether the working selection has uncommitted edits.
    fn is_working_selection_changed(&self) -> bool {
        self.core().selection.is_working_selection_changed()
    }

    /// Whether the working selection selects nothing.
    fn is_working_selection_empty(&self) -> bool {
        self.core().selection.is_working_selection_empty()
    }

    /// Filter built from the committed selection.
    fn get_filter(&self) -> AttributeFilter {
        let core = self.core();
        core.filter_for(&core.selection.get_committed_selection())
    }

    /// Current search.
    fn get_search(&self) -> String {
        self.core().elements_loader.get_search()
    }

    /// Current sort order.
    fn get_order(&self) -> Option<SortDirection> {
        self.core().elements_loader.get_order()
    }

    /// Current limiting measures.
    fn get_limiting_measures(&self) -> Vec<Measure> {
        self.core().elements_loader.get_limiting_measures()
    }

    /// Current parent attribute filters.
    fn get_limiting_attribute_filters(&self) -> Vec<ElementsQueryAttributeFilter> {
        self.core().elements_loader.get_limiting_attribute_filters()
    }

    /// Current limiting date filters.
    fn get_limiting_date_filters(&self) -> Vec<RelativeDateFilter> {
        self.core().elements_loader.get_limiting_date_filters()
    }

    /// Elements loaded by range loads.
    fn get_all_items(&self) -> Vec<AttributeElement> {
        self.core().elements_loader.get_all_items()
    }

    /// Elements by key; `None` where not loaded.
    fn get_items_by_key(&self, keys: &[String]) -> Vec<Option<AttributeElement>> {
        self.core().elements_loader.get_items_by_key(keys)
    }

    /// Total element count; `None` until loaded.
    fn get_total_count(&self) -> Option<u64> {
        self.core().elements_loader.get_total_count()
    }

    /// Element count under the current settings; `None` when unknown.
    fn get_count_with_current_settings(&self) -> Option<u64> {
        self.core().elements_loader.get_count_with_current_settings()
    }

    /// State of the display form load.
    fn get_display_form_info(&self) -> Loadable<DisplayFormMetadata> {
        self.core().display_form_loader.get_display_form_info()
    }

    /// Status of the range loads.
    fn get_loading_status(&self) -> LoadableStatus {
        self.core().elements_loader.get_loading_status()
    }

    /// Combined status of the display form and initial selection loads.
    fn get_init_status(&self) -> LoadableStatus {
        let core = self.core();
        let statuses = [
            core.display_form_loader.get_display_form_info().status(),
            core.elements_loader.get_particular_elements_status(),
        ];
        if statuses.contains(&LoadableStatus::Error) {
            LoadableStatus::Error
        } else if statuses.iter().all(|s| *s == LoadableStatus::Success) {
            LoadableStatus::Success
        } else if statuses.iter().all(|s| *s == LoadableStatus::Pending) {
            LoadableStatus::Pending
        } else {
            LoadableStatus::Loading
        }
    }

    /// First error among the range, display form, total count and
    /// particular-element loads, in that order.
    fn get_current_error(&self) -> Option<FilterError> {
        let core = self.core();
        core.elements_loader
            .get_range_error()
            .or_else(|| core.display_form_loader.get_display_form_info().error().cloned())
            .or_else(|| core.elements_loader.get_total_count_info().error().cloned())
            .or_else(|| core.elements_loader.get_particular_elements_error())
    }

    /// Subscribe to display form load start.
    fn on_display_form_load_start<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<()>) + Send + Sync + 'static,
    {
        self.core().display_form_loader.on_display_form_load_start(callback)
    }

    /// Subscribe to successful display form loads.
    fn on_display_form_load_success<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<DisplayFormMetadata>) + Send + Sync + 'static,
    {
        self.core().display_form_loader.on_display_form_load_success(callback)
    }

    /// Subscribe to failed display form loads.
    fn on_display_form_load_error<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<FilterError>) + Send + Sync + 'static,
    {
        self.core().display_form_loader.on_display_form_load_error(callback)
    }

    /// Subscribe to cancelled display form loads.
    fn on_display_form_load_cancel<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<()>) + Send + Sync + 'static,
    {
        self.core().display_form_loader.on_display_form_load_cancel(callback)
    }

    /// Subscribe to range load start.
    fn on_elements_range_load_start<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<()>) + Send + Sync + 'static,
    {
        self.core().elements_loader.on_elements_range_load_start(callback)
    }

    /// Subscribe to successful range loads.
    fn on_elements_range_load_success<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<ElementsLoadResult>) + Send + Sync + 'static,
    {
        self.core().elements_loader.on_elements_range_load_success(callback)
    }

    /// Subscribe to failed range loads.
    fn on_elements_range_load_error<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<FilterError>) + Send + Sync + 'static,
    {
        self.core().elements_loader.on_elements_range_load_error(callback)
    }

    /// Subscribe to cancelled range loads.
    fn on_elements_range_load_cancel<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<()>) + Send + Sync + 'static,
    {
        self.core().elements_loader.on_elements_range_load_cancel(callback)
    }

    /// Subscribe to particular-element load start.
    fn on_particular_elements_load_start<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<()>) + Send + Sync + 'static,
    {
        self.core().elements_loader.on_particular_elements_load_start(callback)
    }

    /// Subscribe to successful particular-element loads.
    fn on_particular_elements_load_success<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<ElementsLoadResult>) + Send + Sync + 'static,
    {
        self.core().elements_loader.on_particular_elements_load_success(callback)
    }

    /// Subscribe to failed particular-element loads.
    fn on_particular_elements_load_error<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<FilterError>) + Send + Sync + 'static,
    {
        self.core().elements_loader.on_particular_elements_load_error(callback)
    }

    /// Subscribe to cancelled particular-element loads.
    fn on_particular_elements_load_cancel<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<()>) + Send + Sync + 'static,
    {
        self.core().elements_loader.on_particular_elements_load_cancel(callback)
    }
}
