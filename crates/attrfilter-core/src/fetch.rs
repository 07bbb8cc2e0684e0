//! Injected fetch functions and the machinery every load shares
//!
//! `DisplayFormLoad` and `ElementsLoad` are the seams the loaders fetch
//! through. The defaults delegate to the `AnalyticalBackend`; tests and
//! embedders can inject their own.

use crate::error::{FilterError, Result};
use attrfilter_backend::{
    AnalyticalBackend, BackendError, ElementsQuery, ElementsQueryOptions, ElementsQueryResult,
};
use attrfilter_model::{
    DisplayFormMetadata, ElementsQueryAttributeFilter, ElementsSpecification, Measure, ObjRef,
    RelativeDateFilter, SortDirection,
};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// Result of one elements load.
pub type ElementsLoadResult = ElementsQueryResult;

/// Parameters of one elements fetch.
///
/// Range mode (no `elements`) pages through the elements under the current
/// search and limiting filters. Particular mode (`elements` set) fetches an
/// explicit set of elements and must not carry search or limiting filters.
#[derive(Clone)]
pub struct ElementsLoadConfig {
    /// Backend to query
    pub backend: Arc<dyn AnalyticalBackend>,
    /// Workspace id
    pub workspace: String,
    /// Display form whose elements are loaded
    pub display_form: ObjRef,
    /// Number of elements to skip
    pub offset: u32,
    /// Number of elements to load
    pub limit: u32,
    /// Title search
    pub search: Option<String>,
    /// Sort order
    pub order: Option<SortDirection>,
    /// Parent attribute filters
    pub limiting_attribute_filters: Vec<ElementsQueryAttributeFilter>,
    /// Limiting measures
    pub limiting_measures: Vec<Measure>,
    /// Limiting date filters
    pub limiting_date_filters: Vec<RelativeDateFilter>,
    /// Explicit elements to fetch
    pub elements: Option<ElementsSpecification>,
}

impl fmt::Debug for ElementsLoadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementsLoadConfig")
            .field("workspace", &self.workspace)
            .field("display_form", &self.display_form)
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .field("search", &self.search)
            .field("order", &self.order)
            .field("limiting_attribute_filters", &self.limiting_attribute_filters.len())
            .field("limiting_measures", &self.limiting_measures.len())
            .field("limiting_date_filters", &self.limiting_date_filters.len())
            .field("elements", &self.elements)
            .finish_non_exhaustive()
    }
}

impl ElementsLoadConfig {
    /// Config loading `limit` elements from `offset` with no constraints.
    pub fn range(
        backend: Arc<dyn AnalyticalBackend>,
        workspace: impl Into<String>,
        display_form: ObjRef,
        offset: u32,
        limit: u32,
    ) -> Self {
        Self {
            backend,
            workspace: workspace.into(),
            display_form,
            offset,
            limit,
            search: None,
            order: None,
            limiting_attribute_filters: Vec::new(),
            limiting_measures: Vec::new(),
            limiting_date_filters: Vec::new(),
            elements: None,
        }
    }

    fn has_limiting_filters(&self) -> bool {
        !self.limiting_attribute_filters.is_empty()
            || !self.limiting_measures.is_empty()
            || !self.limiting_date_filters.is_empty()
    }

    /// Reject option combinations the backend cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(FilterError::InvalidOptions("limit must be greater than zero".into()));
        }
        if self.elements.is_some() {
            if self.has_limiting_filters() {
                return Err(FilterError::InvalidOptions(
                    "explicit elements cannot be combined with limiting filters".into(),
                ));
            }
            if self.search.as_deref().is_some_and(|s| !s.is_empty()) {
                return Err(FilterError::InvalidOptions(
                    "explicit elements cannot be combined with a search".into(),
                ));
            }
        }
        Ok(())
    }

    /// Translate into a backend elements query.
    #[must_use]
    pub fn to_query(&self) -> ElementsQuery {
        ElementsQuery::for_display_form(self.display_form.clone())
            .with_limit(self.limit)
            .with_offset(self.offset)
            .with_options(ElementsQueryOptions {
                filter: self.search.clone().filter(|s| !s.is_empty()),
                elements: self.elements.clone(),
                order: self.order,
            })
            .with_attribute_filters(self.limiting_attribute_filters.clone())
            .with_measures(self.limiting_measures.clone())
            .with_date_filters(self.limiting_date_filters.clone())
    }
}

/// Loads display form metadata.
#[async_trait::async_trait]
pub trait DisplayFormLoad: Send + Sync {
    /// Fetch the metadata of `display_form`.
    async fn load(
        &self,
        backend: &dyn AnalyticalBackend,
        workspace: &str,
        display_form: &ObjRef,
    ) -> std::result::Result<DisplayFormMetadata, BackendError>;
}

/// Loads one page (or an explicit set) of attribute elements.
#[async_trait::async_trait]
pub trait ElementsLoad: Send + Sync {
    /// Fetch the elements described by `config`.
    async fn load(
        &self,
        config: ElementsLoadConfig,
    ) -> std::result::Result<ElementsLoadResult, BackendError>;
}

/// Default display form load: asks the backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendDisplayFormLoad;

#[async_trait::async_trait]
impl DisplayFormLoad for BackendDisplayFormLoad {
    async fn load(
        &self,
        backend: &dyn AnalyticalBackend,
        workspace: &str,
        display_form: &ObjRef,
    ) -> std::result::Result<DisplayFormMetadata, BackendError> {
        backend.get_attribute_display_form(workspace, display_form).await
    }
}

/// Default elements load: runs a backend elements query.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendElementsLoad;

#[async_trait::async_trait]
impl ElementsLoad for BackendElementsLoad {
    async fn load(
        &self,
        config: ElementsLoadConfig,
    ) -> std::result::Result<ElementsLoadResult, BackendError> {
        let query = config.to_query();
        config.backend.query_elements(&config.workspace, query).await
    }
}

/// Bookkeeping of the load currently tracked in a slot.
pub(crate) struct InFlight<S> {
    pub seq: u64,
    pub token: CancellationToken,
    /// State to restore if this load ends in cancellation
    pub restore: S,
}

/// How a load ended, after staleness and cancellation are accounted for.
pub(crate) enum Settled<T> {
    Success(T),
    Failed(FilterError),
    Cancelled,
}

impl<T> Settled<T> {
    /// Classify a fetch result. Results of loads that were cancelled or
    /// superseded are never applied.
    pub fn from_result(result: Result<T>, token: &CancellationToken, is_current: bool) -> Self {
        if !is_current || token.is_cancelled() {
            return Self::Cancelled;
        }
        match result {
            Ok(value) => Self::Success(value),
            Err(err) if err.is_abort() => Self::Cancelled,
            Err(err) => Self::Failed(err),
        }
    }
}

/// Race a fetch against cancellation and the optional timeout.
pub(crate) async fn guarded_fetch<T, F>(
    token: &CancellationToken,
    timeout: Option<Duration>,
    fetch: F,
) -> Result<T>
where
    F: Future<Output = std::result::Result<T, BackendError>>,
{
    let bounded = async {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, fetch).await {
                Ok(result) => result.map_err(FilterError::from),
                Err(_) => Err(FilterError::Timeout(limit)),
            },
            None => fetch.await.map_err(FilterError::from),
        }
    };

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(FilterError::aborted()),
        result = bounded => result,
    }
}

/// Runtime the loads are spawned on.
pub(crate) fn current_runtime() -> Result<Handle> {
    Handle::try_current().map_err(|e| FilterError::Runtime(e.to_string()))
}
