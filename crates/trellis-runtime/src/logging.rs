//! Structured logging with tracing
//!
//! Centralized subscriber setup driven by [`LoggingConfig`]. The
//! `TRELLIS_LOG` environment variable overrides the configured level
//! filter.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use trellis_core::error::{Error, Result};

pub use crate::config::LoggingConfig;

/// Initialize logging with the provided configuration
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_env("TRELLIS_LOG").unwrap_or_else(|_| EnvFilter::new(&config.level));

    // Types differ per branch so each initializes its own stack.
    let result = if config.json_format {
        let stdout = fmt::layer().json().with_target(config.with_target);
        Registry::default().with(filter).with(stdout).try_init()
    } else {
        let stdout = fmt::layer().with_target(config.with_target);
        Registry::default().with(filter).with(stdout).try_init()
    };

    result.map_err(|e| Error::config_with_source("failed to initialize logging", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_not_reentrant() {
        let config = LoggingConfig::default();
        let first = init_logging(&config);
        let second = init_logging(&config);
        // Whichever call lost the race, the second in this test must fail.
        assert!(first.is_err() || second.is_err());
    }
}
