//! Trellis runtime layer
//!
//! The outermost crate: configuration loading, logging setup, and the
//! bootstrap path that compiles an application definition into a running
//! [`App`]. The build is a one-way door: definitions go into an
//! [`AppBuilder`], `build` consumes it, and the resulting [`App`] exposes
//! only read and invoke surfaces.

pub mod bootstrap;
pub mod config;
pub mod logging;

pub use bootstrap::{App, AppBuilder, OperationHandle, ProducerHandle};
pub use config::{BuildConfig, ConfigLoader, LoggingConfig, RuntimeConfig, CONFIG_ENV_PREFIX};
pub use logging::init_logging;

pub use trellis_core::error::{Error, Result};
