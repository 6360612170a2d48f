//! Conversion configuration.
//!
//! [`ConversionConfig`] carries the knobs the backends and the orchestrator
//! consult: external-tool timeouts, batch concurrency and tool-path
//! overrides. It can be created programmatically, loaded from a TOML file, or
//! left at defaults.
//!
//! Tool binaries are additionally discoverable through environment variables
//! (`UMBAU_SOFFICE_PATH`, `UMBAU_ABIWORD_PATH`, `UMBAU_HWP5HTML_PATH`,
//! `UMBAU_WEASYPRINT_PATH`), which take precedence over config values.

use crate::{Result, UmbauError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_process_timeout() -> u64 {
    60
}

/// Configuration for a conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Wall-clock deadline for a single external-process invocation, in
    /// seconds. Timeout kills the child and is recorded as a failed attempt.
    #[serde(default = "default_process_timeout")]
    pub process_timeout_secs: u64,

    /// Maximum concurrent file conversions in batch operations
    /// (None = num_cpus * 2).
    #[serde(default)]
    pub max_concurrent: Option<usize>,

    /// Explicit path to the LibreOffice `soffice` binary. Checked after the
    /// `UMBAU_SOFFICE_PATH` environment variable and before PATH discovery.
    #[serde(default)]
    pub soffice_path: Option<PathBuf>,

    /// Explicit path to the `abiword` binary.
    #[serde(default)]
    pub abiword_path: Option<PathBuf>,

    /// Explicit path to the `hwp5html` binary.
    #[serde(default)]
    pub hwp5html_path: Option<PathBuf>,

    /// Explicit path to the `weasyprint` binary.
    #[serde(default)]
    pub weasyprint_path: Option<PathBuf>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            process_timeout_secs: default_process_timeout(),
            max_concurrent: None,
            soffice_path: None,
            abiword_path: None,
            hwp5html_path: None,
            weasyprint_path: None,
        }
    }
}

impl ConversionConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| UmbauError::Validation {
            message: format!("Invalid config file {}: {}", path.display(), e),
            source: Some(Box::new(e)),
        })
    }

    /// Effective batch concurrency cap.
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrent.unwrap_or_else(|| num_cpus::get() * 2).max(1)
    }
}
