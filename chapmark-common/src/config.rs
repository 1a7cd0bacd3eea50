//! Configuration loading
//!
//! chapmark reads an optional TOML file. Every field has a built-in
//! default, so an empty file (or no file at all) is a valid configuration.
//!
//! # File location priority
//!
//! 1. Explicit path passed by the caller
//! 2. `CHAPMARK_CONFIG` environment variable
//! 3. `<config_dir>/chapmark/config.toml` (e.g. `~/.config/chapmark/config.toml`)
//! 4. Built-in defaults
//!
//! # Example
//!
//! ```toml
//! [logging]
//! level = "debug"
//! file = "/tmp/chapmark.log"
//!
//! [normalizer]
//! cluster_tolerance_ms = 1
//!
//! [languages]
//! preferred = ["ger", "deu", "eng"]
//!
//! [scanner]
//! max_payload_bytes = 16777216
//! ```

use crate::language;
use crate::normalize::{NormalizeOptions, DEFAULT_CLUSTER_TOLERANCE_MS};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming a configuration file
pub const CONFIG_ENV_VAR: &str = "CHAPMARK_CONFIG";

/// Largest single element/box/frame payload a reader will buffer
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 16 * 1024 * 1024;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChapmarkConfig {
    pub logging: LoggingConfig,
    pub normalizer: NormalizerConfig,
    pub languages: LanguageConfig,
    pub scanner: ScannerConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default = "default_cluster_tolerance_ms")]
    pub cluster_tolerance_ms: i64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            cluster_tolerance_ms: default_cluster_tolerance_ms(),
        }
    }
}

/// Chapter name language preference
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LanguageConfig {
    /// ISO 639-2 codes in order of preference
    ///
    /// Empty means "derive from the process locale".
    #[serde(default)]
    pub preferred: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cluster_tolerance_ms() -> i64 {
    DEFAULT_CLUSTER_TOLERANCE_MS
}

fn default_max_payload_bytes() -> u64 {
    DEFAULT_MAX_PAYLOAD_BYTES
}

impl ChapmarkConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Load configuration from a specific file
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Resolve and load configuration following the location priority
    ///
    /// An explicitly named file (argument or environment variable) must
    /// exist and parse. The per-user default file is optional: when it is
    /// missing the built-in defaults are used.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return Self::load(Path::new(&path));
            }
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                warn!(
                    path = %path.display(),
                    "Config file not found, using default configuration"
                );
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using default configuration");
                Ok(Self::default())
            }
        }
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions::with_tolerance(self.normalizer.cluster_tolerance_ms)
    }

    /// Configured chapter-name languages, or the locale-derived list
    pub fn preferred_languages(&self) -> Vec<String> {
        if self.languages.preferred.is_empty() {
            language::preferred_languages()
        } else {
            self.languages.preferred.clone()
        }
    }
}

/// Per-user configuration file location, if the platform has one
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("chapmark").join("config.toml"))
}
