//! In-memory backend backed by a JSON fixture
//!
//! Implements search, paging, ordering and particular-element lookup over a
//! static element list per display form. Limiting filters are accepted and
//! ignored.

use crate::backend::AnalyticalBackend;
use crate::error::{BackendError, Result};
use crate::query::{ElementsQuery, ElementsQueryResult};
use attrfilter_model::{
    AttributeElement, DisplayFormMetadata, ElementsSpecification, ObjRef, SortDirection,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// One display form and its elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayFormFixture {
    /// Display form metadata
    pub metadata: DisplayFormMetadata,
    /// All elements of the display form, in natural order
    pub elements: Vec<AttributeElement>,
}

impl DisplayFormFixture {
    fn matches(&self, obj_ref: &ObjRef) -> bool {
        if &self.metadata.obj_ref == obj_ref {
            return true;
        }
        match obj_ref {
            ObjRef::Uri { uri } => uri == &self.metadata.uri,
            ObjRef::Identifier { identifier, .. } => identifier == &self.metadata.id,
        }
    }
}

/// Fixture file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendFixture {
    /// Known display forms
    pub display_forms: Vec<DisplayFormFixture>,
}

/// Backend serving a fixed set of display forms from memory.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    fixture: BackendFixture,
    element_queries: AtomicUsize,
}

impl InMemoryBackend {
    /// Create a backend over a fixture.
    #[must_use]
    pub fn new(fixture: BackendFixture) -> Self {
        Self {
            fixture,
            element_queries: AtomicUsize::new(0),
        }
    }

    /// Parse a JSON fixture.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Number of elements queries served so far.
    #[must_use]
    pub fn element_query_count(&self) -> usize {
        self.element_queries.load(Ordering::SeqCst)
    }

    fn find(&self, display_form: &ObjRef) -> Result<&DisplayFormFixture> {
        self.fixture
            .display_forms
            .iter()
            .find(|df| df.matches(display_form))
            .ok_or_else(|| BackendError::NotFound(display_form.to_string()))
    }
}

fn is_requested(element: &AttributeElement, spec: &ElementsSpecification) -> bool {
    match spec {
        ElementsSpecification::Uris(uris) => uris.iter().any(|u| u == &element.uri),
        ElementsSpecification::Values(values) => element
            .title
            .as_ref()
            .is_some_and(|title| values.iter().any(|v| v == title)),
    }
}

fn matches_search(element: &AttributeElement, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    element
        .title
        .as_ref()
        .is_some_and(|title| title.to_lowercase().contains(&needle))
}

#[async_trait::async_trait]
impl AnalyticalBackend for InMemoryBackend {
    async fn get_attribute_display_form(
        &self,
        _workspace: &str,
        display_form: &ObjRef,
    ) -> Result<DisplayFormMetadata> {
        self.find(display_form).map(|df| df.metadata.clone())
    }

    async fn query_elements(
        &self,
        workspace: &str,
        query: ElementsQuery,
    ) -> Result<ElementsQueryResult> {
        self.element_queries.fetch_add(1, Ordering::SeqCst);
        let fixture = self.find(&query.display_form)?;

        if query.has_limiting_filters() {
            debug!(workspace, "Limiting filters are ignored by the in-memory backend");
        }

        let mut matching: Vec<&AttributeElement> = fixture
            .elements
            .iter()
            .filter(|el| {
                query
                    .options
                    .elements
                    .as_ref()
                    .map_or(true, |spec| is_requested(el, spec))
            })
            .filter(|el| {
                query
                    .options
                    .filter
                    .as_deref()
                    .map_or(true, |search| matches_search(el, search))
            })
            .collect();

        match query.options.order {
            Some(SortDirection::Asc) => matching.sort_by(|a, b| a.title.cmp(&b.title)),
            Some(SortDirection::Desc) => matching.sort_by(|a, b| b.title.cmp(&a.title)),
            None => {}
        }

        let total_count = matching.len() as u64;
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(u32::MAX);
        let items: Vec<AttributeElement> = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(ElementsQueryResult {
            items,
            limit,
            offset,
            total_count,
        })
    }
}
