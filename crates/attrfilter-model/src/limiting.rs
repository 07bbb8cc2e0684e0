//! Limiting filters that restrict which elements a dependent filter offers

use crate::error::{ModelError, Result};
use crate::filter::AttributeFilter;
use crate::objref::ObjRef;
use serde::{Deserialize, Serialize};

/// Parent attribute filter applied to an elements query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementsQueryAttributeFilter {
    /// The parent filter
    pub attribute_filter: AttributeFilter,
    /// Attribute connecting the parent filter to the queried one
    pub over_attribute: ObjRef,
}

/// Aggregation of a simple measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureAggregation {
    /// Sum of values
    Sum,
    /// Count of values
    Count,
    /// Average of values
    Avg,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
}

/// How a limiting measure is defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeasureDefinition {
    /// Saved metric or fact aggregated directly
    Simple {
        /// Metric or fact reference
        item: ObjRef,
        /// Optional aggregation (metrics carry their own)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        aggregation: Option<MeasureAggregation>,
    },
    /// Ad-hoc arithmetic over other measures
    Arithmetic {
        /// Operator name (sum, difference, ratio, ...)
        operator: String,
        /// Local ids of operand measures
        measure_identifiers: Vec<String>,
    },
}

/// Measure limiting the elements to those with non-empty values of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    /// Local identifier within the query
    pub local_id: String,
    /// Measure definition
    pub definition: MeasureDefinition,
}

impl Measure {
    /// Simple measure over a metric or fact.
    pub fn simple(local_id: impl Into<String>, item: ObjRef) -> Self {
        Self {
            local_id: local_id.into(),
            definition: MeasureDefinition::Simple {
                item,
                aggregation: None,
            },
        }
    }
}

/// Granularity of a relative date filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateGranularity {
    /// Days
    Date,
    /// Weeks
    Week,
    /// Months
    Month,
    /// Quarters
    Quarter,
    /// Years
    Year,
}

/// Relative date filter, e.g. "last 3 months" is `{Month, -2, 0}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeDateFilter {
    /// Date data set
    pub data_set: ObjRef,
    /// Granularity of `from`/`to`
    pub granularity: DateGranularity,
    /// Start offset relative to now
    pub from: i32,
    /// End offset relative to now
    pub to: i32,
}

impl RelativeDateFilter {
    /// Create a relative date filter; `from` must not be after `to`.
    pub fn new(data_set: ObjRef, granularity: DateGranularity, from: i32, to: i32) -> Result<Self> {
        if from > to {
            return Err(ModelError::InvalidDateRange { from, to });
        }
        Ok(Self {
            data_set,
            granularity,
            from,
            to,
        })
    }
}

/// Sort direction of loaded elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending by title
    #[default]
    Asc,
    /// Descending by title
    Desc,
}
