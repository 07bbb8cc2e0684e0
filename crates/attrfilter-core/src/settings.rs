//! Handler settings

use crate::error::{FilterError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables of the attribute filter handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerSettings {
    /// Maximum number of elements a particular-elements load may request
    #[serde(default = "default_particular_elements_limit")]
    pub particular_elements_limit: u32,
    /// Page size used by `load_next_elements_page`
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Per-load timeout in milliseconds; no timeout when unset
    #[serde(default)]
    pub load_timeout_ms: Option<u64>,
}

fn default_particular_elements_limit() -> u32 {
    1000
}

fn default_page_size() -> u32 {
    50
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            particular_elements_limit: default_particular_elements_limit(),
            default_page_size: default_page_size(),
            load_timeout_ms: None,
        }
    }
}

impl HandlerSettings {
    /// Load timeout, if configured.
    #[must_use]
    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }

    /// Reject settings no load could run with.
    pub fn validate(&self) -> Result<()> {
        if self.default_page_size == 0 {
            return Err(FilterError::InvalidOptions(
                "default_page_size must be greater than zero".into(),
            ));
        }
        if self.particular_elements_limit == 0 {
            return Err(FilterError::InvalidOptions(
                "particular_elements_limit must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = HandlerSettings::default();
        assert_eq!(settings.particular_elements_limit, 1000);
        assert_eq!(settings.default_page_size, 50);
        assert_eq!(settings.load_timeout(), None);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let settings: HandlerSettings =
            serde_json::from_str(r#"{"load_timeout_ms": 250}"#).unwrap();
        assert_eq!(settings.load_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(settings.default_page_size, 50);
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        assert!(HandlerSettings::default().validate().is_ok());

        let no_pages = HandlerSettings {
            default_page_size: 0,
            ..HandlerSettings::default()
        };
        assert!(matches!(no_pages.validate(), Err(FilterError::InvalidOptions(_))));

        let no_particular = HandlerSettings {
            particular_elements_limit: 0,
            ..HandlerSettings::default()
        };
        assert!(matches!(no_particular.validate(), Err(FilterError::InvalidOptions(_))));
    }
}
