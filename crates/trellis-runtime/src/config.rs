//! Runtime configuration
//!
//! Configuration sources are merged in this order (later sources override
//! earlier): defaults from `RuntimeConfig::default()`, an optional TOML
//! file, then `TRELLIS_`-prefixed environment variables.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use trellis_core::error::{Error, Result};

/// Environment variable prefix for overrides
pub const CONFIG_ENV_PREFIX: &str = "TRELLIS";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "trellis_core=debug")
    pub level: String,
    /// Emit JSON-structured output
    pub json_format: bool,
    /// Include the event target in output
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

/// Build-phase configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Name of the root container
    pub root_container: String,
    /// Maximum cycle chain length echoed to the log; the error value
    /// always carries the full minimal chain
    pub cycle_report_limit: usize,
    /// Fail the build when an extension-bound constant matches no
    /// parameter of its element; when false, such constants only warn
    pub strict_unused_constants: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root_container: "app".to_string(),
            cycle_report_limit: 16,
            strict_unused_constants: false,
        }
    }
}

/// Top-level runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Logging settings
    pub logging: LoggingConfig,
    /// Build-phase settings
    pub build: BuildConfig,
}

/// Configuration loader
#[derive(Clone, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Loader with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration file path
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the environment variable prefix
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Load configuration from all sources
    pub fn load(&self) -> Result<RuntimeConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(RuntimeConfig::default()));

        if let Some(config_path) = &self.config_path {
            if config_path.exists() {
                figment = figment.merge(Toml::file(config_path));
            }
        }

        let prefix = self
            .env_prefix
            .clone()
            .unwrap_or_else(|| CONFIG_ENV_PREFIX.to_string());
        figment = figment.merge(Env::prefixed(&format!("{}_", prefix)).split("_"));

        figment
            .extract()
            .map_err(|e| Error::config_with_source("failed to load runtime configuration", e))
    }
}
