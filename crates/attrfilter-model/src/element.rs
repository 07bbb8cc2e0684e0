//! Attribute elements and display form metadata

use crate::objref::ObjRef;
use serde::{Deserialize, Serialize};

/// One discrete value of an attribute (e.g. one country of a "Country" attribute).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeElement {
    /// Element uri, stable identity of the element
    pub uri: String,
    /// Display value; `None` is the "empty" value
    #[serde(default)]
    pub title: Option<String>,
}

impl AttributeElement {
    /// Create an element with a title.
    pub fn new(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: Some(title.into()),
        }
    }

    /// Create an element with the empty (null) value.
    pub fn empty(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: None,
        }
    }

    /// Key of this element under the given key kind.
    ///
    /// Elements with a null title have no value key.
    #[must_use]
    pub fn key(&self, kind: ElementKeyKind) -> Option<&str> {
        match kind {
            ElementKeyKind::Uri => Some(&self.uri),
            ElementKeyKind::Value => self.title.as_deref(),
        }
    }
}

/// How selection keys refer to attribute elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKeyKind {
    /// Keys are element uris
    #[default]
    Uri,
    /// Keys are element values (titles)
    Value,
}

/// Explicit set of elements to fetch, used to resolve titles of a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementsSpecification {
    /// Fetch elements with these uris
    Uris(Vec<String>),
    /// Fetch elements with these values
    Values(Vec<String>),
}

impl ElementsSpecification {
    /// Build a specification of `keys` interpreted by `kind`.
    pub fn from_keys(kind: ElementKeyKind, keys: Vec<String>) -> Self {
        match kind {
            ElementKeyKind::Uri => Self::Uris(keys),
            ElementKeyKind::Value => Self::Values(keys),
        }
    }

    /// The requested keys.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        match self {
            Self::Uris(keys) | Self::Values(keys) => keys,
        }
    }

    /// Key kind of the requested keys.
    #[must_use]
    pub fn key_kind(&self) -> ElementKeyKind {
        match self {
            Self::Uris(_) => ElementKeyKind::Uri,
            Self::Values(_) => ElementKeyKind::Value,
        }
    }

    /// Number of requested elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Whether no element is requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

/// Display form metadata as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFormMetadata {
    /// Reference of the display form itself
    #[serde(rename = "ref")]
    pub obj_ref: ObjRef,
    /// Display form identifier
    pub id: String,
    /// Display form uri
    pub uri: String,
    /// Human readable title
    pub title: String,
    /// Attribute this display form belongs to
    pub attribute: ObjRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_key_by_kind() {
        let el = AttributeElement::new("/elements?id=1", "Prague");
        assert_eq!(el.key(ElementKeyKind::Uri), Some("/elements?id=1"));
        assert_eq!(el.key(ElementKeyKind::Value), Some("Prague"));

        let empty = AttributeElement::empty("/elements?id=2");
        assert_eq!(empty.key(ElementKeyKind::Value), None);
    }

    #[test]
    fn test_specification_from_keys() {
        let spec = ElementsSpecification::from_keys(ElementKeyKind::Value, vec!["a".into()]);
        assert_eq!(spec, ElementsSpecification::Values(vec!["a".into()]));
        assert_eq!(spec.key_kind(), ElementKeyKind::Value);
        assert_eq!(spec.len(), 1);
        assert!(!spec.is_empty());
    }

    #[test]
    fn test_element_deserializes_null_title() {
        let el: AttributeElement = serde_json::from_str(r#"{"uri":"/e/1","title":null}"#).unwrap();
        assert_eq!(el, AttributeElement::empty("/e/1"));
    }
}
