//! Elements query builder and result page

use attrfilter_model::{
    AttributeElement, ElementsQueryAttributeFilter, ElementsSpecification, Measure, ObjRef,
    RelativeDateFilter, SortDirection,
};
use serde::{Deserialize, Serialize};

/// Free-text and explicit-element options of an elements query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementsQueryOptions {
    /// Case-insensitive title substring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Explicit elements to return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<ElementsSpecification>,
    /// Sort order of the returned elements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<SortDirection>,
}

/// One elements page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementsQuery {
    /// Display form whose elements are listed
    pub display_form: ObjRef,
    /// Maximum number of elements returned
    pub limit: Option<u32>,
    /// Number of elements skipped
    pub offset: Option<u32>,
    /// Search and explicit-element options
    pub options: ElementsQueryOptions,
    /// Parent attribute filters
    pub attribute_filters: Vec<ElementsQueryAttributeFilter>,
    /// Limiting measures
    pub measures: Vec<Measure>,
    /// Limiting relative date filters
    pub date_filters: Vec<RelativeDateFilter>,
}

impl ElementsQuery {
    /// Start a query for the elements of a display form.
    pub fn for_display_form(display_form: ObjRef) -> Self {
        Self {
            display_form,
            limit: None,
            offset: None,
            options: ElementsQueryOptions::default(),
            attribute_filters: Vec::new(),
            measures: Vec::new(),
            date_filters: Vec::new(),
        }
    }

    /// Set the page size.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the page offset.
    #[must_use]
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set search / explicit-element options.
    #[must_use]
    pub fn with_options(mut self, options: ElementsQueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Limit by parent attribute filters.
    #[must_use]
    pub fn with_attribute_filters(mut self, filters: Vec<ElementsQueryAttributeFilter>) -> Self {
        self.attribute_filters = filters;
        self
    }

    /// Limit by measures.
    #[must_use]
    pub fn with_measures(mut self, measures: Vec<Measure>) -> Self {
        self.measures = measures;
        self
    }

    /// Limit by relative date filters.
    #[must_use]
    pub fn with_date_filters(mut self, filters: Vec<RelativeDateFilter>) -> Self {
        self.date_filters = filters;
        self
    }

    /// Whether any limiting filter is set.
    #[must_use]
    pub fn has_limiting_filters(&self) -> bool {
        !self.attribute_filters.is_empty()
            || !self.measures.is_empty()
            || !self.date_filters.is_empty()
    }
}

/// One page of elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementsQueryResult {
    /// Elements of the page
    pub items: Vec<AttributeElement>,
    /// Applied page size
    pub limit: u32,
    /// Applied offset
    pub offset: u32,
    /// Number of elements matching the query, across all pages
    pub total_count: u64,
}
