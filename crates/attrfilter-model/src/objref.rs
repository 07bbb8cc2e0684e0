//! Metadata object references

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reference to a metadata object (display form, attribute, data set, measure).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjRef {
    /// Reference by object uri
    Uri {
        /// Object uri
        uri: String,
    },
    /// Reference by identifier
    Identifier {
        /// Object identifier
        identifier: String,
        /// Optional object type hint (e.g. `displayForm`)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
    },
}

impl ObjRef {
    /// Create a uri reference.
    pub fn uri(uri: impl Into<String>) -> Self {
        Self::Uri { uri: uri.into() }
    }

    /// Create an identifier reference without a type hint.
    pub fn identifier(identifier: impl Into<String>) -> Self {
        Self::Identifier {
            identifier: identifier.into(),
            kind: None,
        }
    }

    /// Create an identifier reference with a type hint.
    pub fn identifier_of(identifier: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::Identifier {
            identifier: identifier.into(),
            kind: Some(kind.into()),
        }
    }

    /// The uri or identifier string, whichever this reference carries.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Uri { uri } => uri,
            Self::Identifier { identifier, .. } => identifier,
        }
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uri { uri } => write!(f, "uri:{}", uri),
            Self::Identifier {
                identifier,
                kind: Some(kind),
            } => write!(f, "{}:{}", kind, identifier),
            Self::Identifier { identifier, .. } => write!(f, "id:{}", identifier),
        }
    }
}

/// Parses `uri:<uri>`, `id:<identifier>` or `<kind>:<identifier>`.
/// A bare string starting with `/` is taken as a uri, anything else as an identifier.
impl FromStr for ObjRef {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ModelError::InvalidRef(s.to_string()));
        }
        match s.split_once(':') {
            Some(("uri", rest)) if !rest.is_empty() => Ok(Self::uri(rest)),
            Some(("id", rest)) if !rest.is_empty() => Ok(Self::identifier(rest)),
            Some((kind, rest))
                if !kind.is_empty() && !rest.is_empty() && !kind.starts_with('/') =>
            {
                Ok(Self::identifier_of(rest, kind))
            }
            Some(_) if !s.starts_with('/') => Err(ModelError::InvalidRef(s.to_string())),
            _ if s.starts_with('/') => Ok(Self::uri(s)),
            _ => Ok(Self::identifier(s)),
        }
    }
}
