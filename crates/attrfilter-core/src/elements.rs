//! Attribute elements loader
//!
//! Pages through the elements of a display form under the current search,
//! sort order and limiting filters, and keeps a key → element dictionary
//! that also receives elements fetched by explicit key.
//!
//! A new range load supersedes the one in flight. Particular-element loads
//! only add dictionary entries, so they never supersede each other; each
//! keeps its own token until it settles or `cancel_element_load` runs.
//! Results of cancelled or superseded loads are never applied.

use crate::callbacks::{CallbackPayload, CallbackRegistry, Correlation, Unsubscribe};
use crate::error::{FilterError, Result};
use crate::fetch::{
    current_runtime, guarded_fetch, ElementsLoad, ElementsLoadConfig, ElementsLoadResult,
    InFlight, Settled,
};
use crate::loadable::{Loadable, LoadableStatus};
use crate::lock;
use crate::settings::HandlerSettings;
use attrfilter_backend::AnalyticalBackend;
use attrfilter_model::{
    AttributeElement, ElementKeyKind, ElementsQueryAttributeFilter, ElementsSpecification, Measure,
    ObjRef, RelativeDateFilter, SortDirection,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Clone, Copy)]
enum Slot {
    Range,
    Particular,
}

/// Particular-element loads currently running.
#[derive(Default)]
struct ParticularLoads {
    in_flight: HashMap<u64, CancellationToken>,
    /// Status to fall back to when every load of the batch is cancelled
    restore: Loadable<()>,
    /// Outcome of the latest load of the batch that was not cancelled
    outcome: Option<Loadable<()>>,
}

#[derive(Default)]
struct ElementsState {
    search: Option<String>,
    order: Option<SortDirection>,
    limiting_attribute_filters: Vec<ElementsQueryAttributeFilter>,
    limiting_measures: Vec<Measure>,
    limiting_date_filters: Vec<RelativeDateFilter>,

    items: Vec<AttributeElement>,
    item_uris: HashSet<String>,
    dictionary: HashMap<String, AttributeElement>,

    total_count: Loadable<u64>,
    total_count_flight: Option<InFlight<Loadable<u64>>>,
    count_with_current_settings: Option<u64>,

    range_load: Loadable<()>,
    range: Option<InFlight<Loadable<()>>>,
    particular_load: Loadable<()>,
    particular: ParticularLoads,
    next_seq: u64,
}

impl ElementsState {
    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Track a new range load, cancelling the one it replaces.
    fn begin_range(&mut self) -> (u64, CancellationToken) {
        let seq = self.next_seq();
        let token = CancellationToken::new();
        let restore = match self.range.take() {
            Some(previous) => {
                previous.token.cancel();
                previous.restore
            }
            None => self.range_load.clone(),
        };
        self.range = Some(InFlight {
            seq,
            token: token.clone(),
            restore,
        });
        self.range_load = Loadable::Loading;
        (seq, token)
    }

    /// Track a new particular-element load next to the ones already running.
    fn begin_particular(&mut self) -> (u64, CancellationToken) {
        let seq = self.next_seq();
        let token = CancellationToken::new();
        if self.particular.in_flight.is_empty() {
            self.particular.restore = self.particular_load.clone();
            self.particular.outcome = None;
        }
        self.particular.in_flight.insert(seq, token.clone());
        self.particular_load = Loadable::Loading;
        (seq, token)
    }

    /// Track a new total count load, cancelling the one it replaces.
    fn begin_total_count(&mut self) -> (u64, CancellationToken) {
        let seq = self.next_seq();
        let token = CancellationToken::new();
        let restore = match self.total_count_flight.take() {
            Some(previous) => {
                previous.token.cancel();
                previous.restore
            }
            None => self.total_count.clone(),
        };
        self.total_count_flight = Some(InFlight {
            seq,
            token: token.clone(),
            restore,
        });
        self.total_count = Loadable::Loading;
        (seq, token)
    }

    fn cancel_range(&mut self) {
        if let Some(flight) = &self.range {
            flight.token.cancel();
        }
    }

    fn cancel_all(&mut self) {
        self.cancel_range();
        for token in self.particular.in_flight.values() {
            token.cancel();
        }
        if let Some(flight) = &self.total_count_flight {
            flight.token.cancel();
        }
    }

    /// Apply the result of a range or particular-element load.
    fn settle(
        &mut self,
        slot: Slot,
        key_kind: ElementKeyKind,
        seq: u64,
        token: &CancellationToken,
        result: Result<ElementsLoadResult>,
    ) -> Settled<ElementsLoadResult> {
        match slot {
            Slot::Range => {
                let is_current = self.range.as_ref().is_some_and(|f| f.seq == seq);
                let flight = if is_current { self.range.take() } else { None };
                let settled = Settled::from_result(result, token, is_current);
                if let Some(flight) = flight {
                    self.range_load = match &settled {
                        Settled::Success(page) => {
                            self.cache(key_kind, &page.items);
                            for element in &page.items {
                                if self.item_uris.insert(element.uri.clone()) {
                                    self.items.push(element.clone());
                                }
                            }
                            self.count_with_current_settings = Some(page.total_count);
                            Loadable::Success(())
                        }
                        Settled::Failed(err) => Loadable::Error(err.clone()),
                        Settled::Cancelled => flight.restore,
                    };
                }
                settled
            }
            Slot::Particular => {
                let is_current = self.particular.in_flight.remove(&seq).is_some();
                let settled = Settled::from_result(result, token, is_current);
                if is_current {
                    match &settled {
                        Settled::Success(page) => {
                            self.cache(key_kind, &page.items);
                            self.particular.outcome = Some(Loadable::Success(()));
                        }
                        Settled::Failed(err) => {
                            self.particular.outcome = Some(Loadable::Error(err.clone()));
                        }
                        Settled::Cancelled => {}
                    }
                    if self.particular.in_flight.is_empty() {
                        self.particular_load = self
                            .particular
                            .outcome
                            .take()
                            .unwrap_or_else(|| self.particular.restore.clone());
                    }
                }
                settled
            }
        }
    }

    fn reset_items(&mut self) {
        self.cancel_range();
        self.items.clear();
        self.item_uris.clear();
        self.count_with_current_settings = None;
    }

    fn cache(&mut self, key_kind: ElementKeyKind, elements: &[AttributeElement]) {
        for element in elements {
            if let Some(key) = element.key(key_kind) {
                self.dictionary.insert(key.to_string(), element.clone());
            }
        }
    }
}

struct Channels {
    start: CallbackRegistry<()>,
    success: CallbackRegistry<ElementsLoadResult>,
    error: CallbackRegistry<FilterError>,
    cancel: CallbackRegistry<()>,
}

impl Channels {
    fn new() -> Self {
        Self {
            start: CallbackRegistry::new(),
            success: CallbackRegistry::new(),
            error: CallbackRegistry::new(),
            cancel: CallbackRegistry::new(),
        }
    }
}

struct Inner {
    display_form: ObjRef,
    backend: Arc<dyn AnalyticalBackend>,
    workspace: String,
    load: Arc<dyn ElementsLoad>,
    key_kind: ElementKeyKind,
    settings: HandlerSettings,
    state: Mutex<ElementsState>,
    range_channels: Channels,
    particular_channels: Channels,
}

/// Loads, pages and caches the elements of one display form.
#[derive(Clone)]
pub struct DefaultAttributeElementsLoader {
    inner: Arc<Inner>,
}

impl DefaultAttributeElementsLoader {
    /// Create a loader; nothing is fetched until a load method is called.
    ///
    /// `key_kind` decides how the dictionary is keyed: by uri or by value.
    pub fn new(
        display_form: ObjRef,
        backend: Arc<dyn AnalyticalBackend>,
        workspace: impl Into<String>,
        load: Arc<dyn ElementsLoad>,
        key_kind: ElementKeyKind,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                display_form,
                backend,
                workspace: workspace.into(),
                load,
                key_kind,
                settings,
                state: Mutex::new(ElementsState::default()),
                range_channels: Channels::new(),
                particular_channels: Channels::new(),
            }),
        }
    }

    fn base_config(&self, offset: u32, limit: u32) -> ElementsLoadConfig {
        ElementsLoadConfig::range(
            Arc::clone(&self.inner.backend),
            self.inner.workspace.clone(),
            self.inner.display_form.clone(),
            offset,
            limit,
        )
    }

    /// Load the global element count, ignoring search and limiting filters.
    ///
    /// Supersedes a total count load in flight. A cancelled load leaves the
    /// count as it was before the load started.
    pub fn load_total_count(&self) -> Result<JoinHandle<()>> {
        let runtime = current_runtime()?;
        let config = self.base_config(0, 1);
        let (seq, token) = lock(&self.inner.state).begin_total_count();

        let this = self.clone();
        Ok(runtime.spawn(async move {
            let inner = &this.inner;
            let fetch = inner.load.load(config);
            let result = guarded_fetch(&token, inner.settings.load_timeout(), fetch).await;

            let mut state = lock(&inner.state);
            let flight = match state.total_count_flight.take() {
                Some(flight) if flight.seq == seq => flight,
                newer => {
                    state.total_count_flight = newer;
                    return;
                }
            };
            state.total_count = match Settled::from_result(result, &token, true) {
                Settled::Success(page) => Loadable::Success(page.total_count),
                Settled::Failed(err) => {
                    warn!(
                        display_form = %inner.display_form,
                        error = %err,
                        "Total count load failed"
                    );
                    Loadable::Error(err)
                }
                Settled::Cancelled => flight.restore,
            };
        }))
    }

    /// Load `limit` elements starting at `offset` under the current settings.
    ///
    /// Cancels the range load in flight, if any. Loaded elements are merged
    /// into the item list by uri; an element already listed is not repeated.
    pub fn load_elements_range(
        &self,
        offset: u32,
        limit: u32,
        correlation: Option<Correlation>,
    ) -> Result<JoinHandle<()>> {
        let runtime = current_runtime()?;
        let (seq, token, config) = {
            let mut state = lock(&self.inner.state);
            let config = ElementsLoadConfig {
                search: state.search.clone(),
                order: state.order,
                limiting_attribute_filters: state.limiting_attribute_filters.clone(),
                limiting_measures: state.limiting_measures.clone(),
                limiting_date_filters: state.limiting_date_filters.clone(),
                ..self.base_config(offset, limit)
            };
            config.validate()?;
            let (seq, token) = state.begin_range();
            (seq, token, config)
        };

        debug!(
            display_form = %self.inner.display_form,
            offset,
            limit,
            correlation = correlation.as_deref().unwrap_or_default(),
            "Loading elements range"
        );
        self.inner.range_channels.start.trigger_all(correlation.clone(), ());

        let this = self.clone();
        Ok(runtime.spawn(async move {
            this.run_load(Slot::Range, seq, token, config, correlation).await
        }))
    }

    /// Load the next page after the items loaded so far.
    pub fn load_next_elements_page(
        &self,
        correlation: Option<Correlation>,
    ) -> Result<JoinHandle<()>> {
        let offset = lock(&self.inner.state).items.len() as u32;
        self.load_elements_range(offset, self.inner.settings.default_page_size, correlation)
    }

    /// Load an explicit set of elements, e.g. to resolve titles of a selection.
    ///
    /// Only the dictionary is updated; the paged item list is left alone.
    /// Loads run side by side and never cancel each other. An empty
    /// specification completes without calling the backend. Requests for
    /// more than `particular_elements_limit` keys are rejected.
    pub fn load_particular_elements(
        &self,
        elements: ElementsSpecification,
        correlation: Option<Correlation>,
    ) -> Result<JoinHandle<()>> {
        let max = self.inner.settings.particular_elements_limit;
        if elements.len() > max as usize {
            return Err(FilterError::InvalidOptions(format!(
                "cannot load {} particular elements, the limit is {}",
                elements.len(),
                max
            )));
        }
        self.spawn_particular(elements, correlation)
    }

    /// Load any number of keys as particular-element loads of at most
    /// `particular_elements_limit` keys each.
    ///
    /// No keys still runs one (empty) load, so the status settles.
    pub fn load_particular_elements_in_batches(
        &self,
        key_kind: ElementKeyKind,
        keys: Vec<String>,
        correlation: Option<Correlation>,
    ) -> Result<Vec<JoinHandle<()>>> {
        let max = self.inner.settings.particular_elements_limit.max(1) as usize;
        if keys.len() <= max {
            let elements = ElementsSpecification::from_keys(key_kind, keys);
            return Ok(vec![self.spawn_particular(elements, correlation)?]);
        }

        info!(
            display_form = %self.inner.display_form,
            keys = keys.len(),
            batch = max,
            "Splitting particular elements load into batches"
        );
        keys.chunks(max)
            .map(|chunk| {
                let elements = ElementsSpecification::from_keys(key_kind, chunk.to_vec());
                self.spawn_particular(elements, correlation.clone())
            })
            .collect()
    }

    fn spawn_particular(
        &self,
        elements: ElementsSpecification,
        correlation: Option<Correlation>,
    ) -> Result<JoinHandle<()>> {
        let runtime = current_runtime()?;
        let limit = self.inner.settings.particular_elements_limit.max(1);
        let config = ElementsLoadConfig {
            elements: Some(elements),
            ..self.base_config(0, limit)
        };
        config.validate()?;

        let (seq, token) = lock(&self.inner.state).begin_particular();

        debug!(
            display_form = %self.inner.display_form,
            count = config.elements.as_ref().map_or(0, ElementsSpecification::len),
            correlation = correlation.as_deref().unwrap_or_default(),
            "Loading particular elements"
        );
        self.inner.particular_channels.start.trigger_all(correlation.clone(), ());

        let this = self.clone();
        Ok(runtime.spawn(async move {
            this.run_load(Slot::Particular, seq, token, config, correlation).await
        }))
    }

    async fn run_load(
        &self,
        slot: Slot,
        seq: u64,
        token: CancellationToken,
        config: ElementsLoadConfig,
        correlation: Option<Correlation>,
    ) {
        let inner = &self.inner;
        let result = if config.elements.as_ref().is_some_and(ElementsSpecification::is_empty) {
            Ok(ElementsLoadResult {
                items: Vec::new(),
                limit: config.limit,
                offset: 0,
                total_count: 0,
            })
        } else {
            guarded_fetch(&token, inner.settings.load_timeout(), inner.load.load(config)).await
        };

        let settled = lock(&inner.state).settle(slot, inner.key_kind, seq, &token, result);

        let channels = match slot {
            Slot::Range => &inner.range_channels,
            Slot::Particular => &inner.particular_channels,
        };
        match settled {
            Settled::Success(page) => {
                debug!(
                    display_form = %inner.display_form,
                    loaded = page.items.len(),
                    total = page.total_count,
                    "Elements loaded"
                );
                channels.success.trigger_all(correlation, page);
            }
            Settled::Failed(err) => {
                warn!(display_form = %inner.display_form, error = %err, "Elements load failed");
                channels.error.trigger_all(correlation, err);
            }
            Settled::Cancelled => {
                debug!(display_form = %inner.display_form, "Elements load cancelled");
                channels.cancel.trigger_all(correlation, ());
            }
        }
    }

    /// Set the title search. Resets loaded items; does not load.
    pub fn set_search(&self, search: impl Into<String>) {
        let mut state = lock(&self.inner.state);
        state.reset_items();
        state.search = Some(search.into());
    }

    /// Set the sort order. Resets loaded items; does not load.
    pub fn set_order(&self, order: SortDirection) {
        let mut state = lock(&self.inner.state);
        state.reset_items();
        state.order = Some(order);
    }

    /// Set the measures limiting the elements. Resets loaded items; does not load.
    pub fn set_limiting_measures(&self, measures: Vec<Measure>) {
        let mut state = lock(&self.inner.state);
        state.reset_items();
        state.limiting_measures = measures;
    }

    /// Set the parent attribute filters. Resets loaded items; does not load.
    pub fn set_limiting_attribute_filters(&self, filters: Vec<ElementsQueryAttributeFilter>) {
        let mut state = lock(&self.inner.state);
        state.reset_items();
        state.limiting_attribute_filters = filters;
    }

    /// Set the date filters limiting the elements. Resets loaded items; does not load.
    pub fn set_limiting_date_filters(&self, filters: Vec<RelativeDateFilter>) {
        let mut state = lock(&self.inner.state);
        state.reset_items();
        state.limiting_date_filters = filters;
    }

    /// Cancel range, particular-element and total count loads in flight.
    pub fn cancel_element_load(&self) {
        lock(&self.inner.state).cancel_all();
    }

    /// Elements loaded by range loads, in load order.
    #[must_use]
    pub fn get_all_items(&self) -> Vec<AttributeElement> {
        lock(&self.inner.state).items.clone()
    }

    /// Look up elements by key; unknown keys resolve to `None`.
    #[must_use]
    pub fn get_items_by_key(&self, keys: &[String]) -> Vec<Option<AttributeElement>> {
        let state = lock(&self.inner.state);
        keys.iter().map(|key| state.dictionary.get(key).cloned()).collect()
    }

    /// Current search, empty when unset.
    #[must_use]
    pub fn get_search(&self) -> String {
        lock(&self.inner.state).search.clone().unwrap_or_default()
    }

    /// Current sort order, if set.
    #[must_use]
    pub fn get_order(&self) -> Option<SortDirection> {
        lock(&self.inner.state).order
    }

    /// Current limiting measures.
    #[must_use]
    pub fn get_limiting_measures(&self) -> Vec<Measure> {
        lock(&self.inner.state).limiting_measures.clone()
    }

    /// Current parent attribute filters.
    #[must_use]
    pub fn get_limiting_attribute_filters(&self) -> Vec<ElementsQueryAttributeFilter> {
        lock(&self.inner.state).limiting_attribute_filters.clone()
    }

    /// Current limiting date filters.
    #[must_use]
    pub fn get_limiting_date_filters(&self) -> Vec<RelativeDateFilter> {
        lock(&self.inner.state).limiting_date_filters.clone()
    }

    /// Number of elements of the display form; `None` until loaded.
    #[must_use]
    pub fn get_total_count(&self) -> Option<u64> {
        lock(&self.inner.state).total_count.result().copied()
    }

    /// State of the total count load.
    #[must_use]
    pub fn get_total_count_info(&self) -> Loadable<u64> {
        lock(&self.inner.state).total_count.clone()
    }

    /// Number of elements under the current settings; `None` when unknown.
    #[must_use]
    pub fn get_count_with_current_settings(&self) -> Option<u64> {
        lock(&self.inner.state).count_with_current_settings
    }

    /// Status of the range loads.
    #[must_use]
    pub fn get_loading_status(&self) -> LoadableStatus {
        lock(&self.inner.state).range_load.status()
    }

    /// Error of the last range load, if it failed.
    #[must_use]
    pub fn get_range_error(&self) -> Option<FilterError> {
        lock(&self.inner.state).range_load.error().cloned()
    }

    /// Status of the particular-element loads.
    #[must_use]
    pub fn get_particular_elements_status(&self) -> LoadableStatus {
        lock(&self.inner.state).particular_load.status()
    }

    /// Error of the last particular-element load, if it failed.
    #[must_use]
    pub fn get_particular_elements_error(&self) -> Option<FilterError> {
        lock(&self.inner.state).particular_load.error().cloned()
    }

    /// Key kind of the dictionary.
    #[must_use]
    pub fn key_kind(&self) -> ElementKeyKind {
        self.inner.key_kind
    }

    /// Subscribe to range load start.
    pub fn on_elements_range_load_start<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<()>) + Send + Sync + 'static,
    {
        self.inner.range_channels.start.subscribe(callback)
    }

    /// Subscribe to successful range loads.
    pub fn on_elements_range_load_success<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<ElementsLoadResult>) + Send + Sync + 'static,
    {
        self.inner.range_channels.success.subscribe(callback)
    }

    /// Subscribe to failed range loads.
    pub fn on_elements_range_load_error<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<FilterError>) + Send + Sync + 'static,
    {
        self.inner.range_channels.error.subscribe(callback)
    }

    /// Subscribe to cancelled range loads.
    pub fn on_elements_range_load_cancel<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<()>) + Send + Sync + 'static,
    {
        self.inner.range_channels.cancel.subscribe(callback)
    }

    /// Subscribe to particular-element load start.
    pub fn on_particular_elements_load_start<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<()>) + Send + Sync + 'static,
    {
        self.inner.particular_channels.start.subscribe(callback)
    }

    /// Subscribe to successful particular-element loads.
    pub fn on_particular_elements_load_success<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<ElementsLoadResult>) + Send + Sync + 'static,
    {
        self.inner.particular_channels.success.subscribe(callback)
    }

    /// Subscribe to failed particular-element loads.
    pub fn on_particular_elements_load_error<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<FilterError>) + Send + Sync + 'static,
    {
        self.inner.particular_channels.error.subscribe(callback)
    }

    /// Subscribe to cancelled particular-element loads.
    pub fn on_particular_elements_load_cancel<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<()>) + Send + Sync + 'static,
    {
        self.inner.particular_channels.cancel.subscribe(callback)
    }
}

#[cfg(test)]
mod tests;
