//! Positive and negative attribute filters

use crate::element::ElementKeyKind;
use crate::objref::ObjRef;
use serde::{Deserialize, Serialize};

/// Elements of an attribute filter, either by reference (uris) or by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeElements {
    /// Elements referenced by uri
    Uris(Vec<String>),
    /// Elements referenced by value
    Values(Vec<String>),
}

impl AttributeElements {
    /// Build elements of the given key kind.
    pub fn from_keys(kind: ElementKeyKind, keys: Vec<String>) -> Self {
        match kind {
            ElementKeyKind::Uri => Self::Uris(keys),
            ElementKeyKind::Value => Self::Values(keys),
        }
    }

    /// Whether the elements are expressed by reference.
    #[must_use]
    pub fn is_by_ref(&self) -> bool {
        matches!(self, Self::Uris(_))
    }

    /// Key kind used by these elements.
    #[must_use]
    pub fn key_kind(&self) -> ElementKeyKind {
        if self.is_by_ref() {
            ElementKeyKind::Uri
        } else {
            ElementKeyKind::Value
        }
    }

    /// Element keys in filter order.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        match self {
            Self::Uris(keys) | Self::Values(keys) => keys,
        }
    }

    /// Whether no element is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

/// Attribute filter over one display form.
///
/// A positive filter lists the included elements, a negative one the excluded
/// elements. A negative filter with no elements selects everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeFilter {
    /// Include only the listed elements
    Positive {
        /// Filtered display form
        display_form: ObjRef,
        /// Included elements
        elements: AttributeElements,
    },
    /// Exclude the listed elements
    Negative {
        /// Filtered display form
        display_form: ObjRef,
        /// Excluded elements
        elements: AttributeElements,
    },
}

impl AttributeFilter {
    /// Create a positive filter.
    pub fn positive(display_form: ObjRef, elements: AttributeElements) -> Self {
        Self::Positive {
            display_form,
            elements,
        }
    }

    /// Create a negative filter.
    pub fn negative(display_form: ObjRef, elements: AttributeElements) -> Self {
        Self::Negative {
            display_form,
            elements,
        }
    }

    /// Negative filter with no excluded elements.
    pub fn select_all(display_form: ObjRef, kind: ElementKeyKind) -> Self {
        Self::negative(display_form, AttributeElements::from_keys(kind, Vec::new()))
    }

    /// Filtered display form.
    #[must_use]
    pub fn display_form(&self) -> &ObjRef {
        match self {
            Self::Positive { display_form, .. } | Self::Negative { display_form, .. } => {
                display_form
            }
        }
    }

    /// Filter elements.
    #[must_use]
    pub fn elements(&self) -> &AttributeElements {
        match self {
            Self::Positive { elements, .. } | Self::Negative { elements, .. } => elements,
        }
    }

    /// Whether this is a positive filter.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Positive { .. })
    }

    /// Whether this is a negative filter.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        !self.is_positive()
    }

    /// Whether the filter does not restrict anything.
    #[must_use]
    pub fn is_select_all(&self) -> bool {
        self.is_negative() && self.elements().is_empty()
    }

    /// Same polarity and display form, different elements.
    #[must_use]
    pub fn with_elements(&self, elements: AttributeElements) -> Self {
        match self {
            Self::Positive { display_form, .. } => Self::positive(display_form.clone(), elements),
            Self::Negative { display_form, .. } => Self::negative(display_form.clone(), elements),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn df() -> ObjRef {
        ObjRef::identifier("label.city")
    }

    #[test]
    fn test_polarity() {
        let pos = AttributeFilter::positive(df(), AttributeElements::Uris(vec!["u1".into()]));
        assert!(pos.is_positive());
        assert!(!pos.is_negative());
        assert!(!pos.is_select_all());

        let all = AttributeFilter::select_all(df(), ElementKeyKind::Value);
        assert!(all.is_negative());
        assert!(all.is_select_all());
        assert!(!all.elements().is_by_ref());
    }

    #[test]
    fn test_with_elements_keeps_polarity() {
        let neg = AttributeFilter::negative(df(), AttributeElements::Values(vec!["a".into()]));
        let replaced = neg.with_elements(AttributeElements::Values(vec!["b".into()]));
        assert!(replaced.is_negative());
        assert_eq!(replaced.elements().keys(), ["b".to_string()]);
        assert_eq!(replaced.display_form(), &df());
    }

    #[test]
    fn test_filter_json_shape() {
        let filter = AttributeFilter::positive(df(), AttributeElements::Uris(vec!["u1".into()]));
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["type"], "positive");
        assert_eq!(json["elements"]["uris"][0], "u1");
    }
}
