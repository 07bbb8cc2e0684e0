//! Analytical backend trait

use crate::error::Result;
use crate::query::{ElementsQuery, ElementsQueryResult};
use attrfilter_model::{DisplayFormMetadata, ObjRef};

/// Capabilities of an analytical backend used by attribute filters.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait::async_trait]
pub trait AnalyticalBackend: Send + Sync {
    /// Load display form metadata (title, owning attribute).
    async fn get_attribute_display_form(
        &self,
        workspace: &str,
        display_form: &ObjRef,
    ) -> Result<DisplayFormMetadata>;

    /// Query one page of attribute elements.
    async fn query_elements(
        &self,
        workspace: &str,
        query: ElementsQuery,
    ) -> Result<ElementsQueryResult>;
}
