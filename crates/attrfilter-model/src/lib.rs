//! Attrfilter Model - Filter Value Objects
//!
//! This crate provides the pure, synchronous value objects the attribute
//! filter handler works with:
//! - `ObjRef`: reference to a metadata object (by uri or identifier)
//! - `AttributeElement`: one value of an attribute
//! - `AttributeFilter`: positive/negative attribute filter
//! - Limiting filters: parent attribute filters, measures, relative date filters
//!
//! # Example
//!
//! ```
//! use attrfilter_model::{AttributeElements, AttributeFilter, ObjRef};
//!
//! let filter = AttributeFilter::positive(
//!     ObjRef::uri("/gdc/md/ws/obj/1028"),
//!     AttributeElements::Uris(vec!["/gdc/md/ws/obj/1028/elements?id=1".to_string()]),
//! );
//! assert!(filter.is_positive());
//! assert!(filter.elements().is_by_ref());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod element;
pub mod error;
pub mod filter;
pub mod limiting;
pub mod objref;

pub use element::{AttributeElement, DisplayFormMetadata, ElementKeyKind, ElementsSpecification};
pub use error::{ModelError, Result};
pub use filter::{AttributeElements, AttributeFilter};
pub use limiting::{
    DateGranularity, ElementsQueryAttributeFilter, Measure, MeasureAggregation, MeasureDefinition,
    RelativeDateFilter, SortDirection,
};
pub use objref::ObjRef;
