//! Application configuration
//!
//! `AppConfig` is resolved by [`loader::load_config`] from the embedded
//! defaults, optional local overrides and `ATTRFILTER_*` variables.

pub mod loader;

use anyhow::{Context, Result};
use attrfilter_backend::InMemoryBackend;
use attrfilter_core::HandlerSettings;
use attrfilter_model::ObjRef;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Workspace the handler queries
    pub workspace: String,
    /// JSON fixture served by the in-memory backend
    pub fixture: PathBuf,
    /// Display form to filter by (`id:..`, `uri:..` or a bare identifier)
    pub display_form: String,
    #[serde(default)]
    pub handler: HandlerSettings,
}

impl AppConfig {
    /// Parsed display form reference.
    pub fn display_form_ref(&self) -> Result<ObjRef> {
        self.display_form
            .parse()
            .with_context(|| format!("Invalid display form reference '{}'", self.display_form))
    }

    /// Read the fixture into a backend.
    pub fn open_backend(&self) -> Result<InMemoryBackend> {
        read_fixture(&self.fixture)
    }
}

fn read_fixture(path: &Path) -> Result<InMemoryBackend> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;
    InMemoryBackend::from_json(&content)
        .with_context(|| format!("Failed to parse fixture {}", path.display()))
}
