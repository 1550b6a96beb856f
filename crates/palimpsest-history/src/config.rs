#![forbid(unsafe_code)]

//! History limits.
//!
//! [`HistoryConfig`] bounds the history log: how many Versions are kept and
//! how many stay decoded around the cursor. With the `history-config`
//! feature it can be loaded from TOML or JSON:
//!
//! ```toml
//! # palimpsest-history.toml
//! max_depth = 250
//! keep_loaded = 16
//! ```
//!
//! ```rust,ignore
//! let config = HistoryConfig::from_toml_file("palimpsest-history.toml")?;
//! ```
//!
//! Fields missing from a file keep their defaults.

#[cfg(feature = "history-config")]
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HistoryError, Result};

/// Configuration for the history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of Versions kept; the oldest are evicted first.
    pub max_depth: usize,
    /// Versions within this distance of the cursor are never unloaded.
    pub keep_loaded: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: 100,
            keep_loaded: 8,
        }
    }
}

impl HistoryConfig {
    #[must_use]
    pub fn new(max_depth: usize, keep_loaded: usize) -> Self {
        Self {
            max_depth,
            keep_loaded,
        }
    }

    /// Keep every Version, all of them decoded.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
            keep_loaded: usize::MAX,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_keep_loaded(mut self, keep_loaded: usize) -> Self {
        self.keep_loaded = keep_loaded;
        self
    }

    /// Load from a TOML string.
    #[cfg(feature = "history-config")]
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.into_validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "history-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "history-config")]
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s).map_err(HistoryError::Decode)?;
        config.into_validated()
    }

    /// Validate the limits.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_depth == 0 {
            errors.push("max_depth must be > 0".to_string());
        }
        if self.keep_loaded == 0 {
            errors.push("keep_loaded must be > 0".to_string());
        }
        errors
    }

    /// The config with every zero limit raised to one.
    ///
    /// Used where a config is taken without a `Result` to report through,
    /// such as [`HistoryLog::new`](crate::log::HistoryLog::new). Raised
    /// limits are logged at `warn`.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let errors = self.validate();
        if errors.is_empty() {
            return self;
        }
        tracing::warn!(
            target: "palimpsest.history",
            errors = %errors.join("; "),
            "invalid history config; zero limits raised to 1"
        );
        Self {
            max_depth: self.max_depth.max(1),
            keep_loaded: self.keep_loaded.max(1),
        }
    }

    /// The config itself if valid, else the joined validation errors.
    pub fn into_validated(self) -> Result<Self> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(HistoryError::invalid_config(errors.join("; ")))
        }
    }
}
