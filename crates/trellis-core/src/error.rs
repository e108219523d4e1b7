//! Error handling types

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Trellis runtime
///
/// Every failure surfaces synchronously to the build caller. No variant is
/// retried automatically and there is no partial-success mode: a build is
/// all-or-nothing.
#[derive(Error, Debug)]
pub enum Error {
    /// A dependency cycle was detected during graph resolution
    #[error("dependency cycle: {}", chain.join(" -> "))]
    Cycle {
        /// The minimal cycle, one label per node, in chain order
        chain: Vec<String>,
    },

    /// A required binding could not be satisfied
    #[error("unresolved dependency on element '{element}': no constant, producer, or context value for key '{key}'")]
    UnresolvedBinding {
        /// The element whose binding failed
        element: String,
        /// The key that could not be resolved
        key: String,
    },

    /// An arena slot was written twice
    ///
    /// This is a logic defect in graph construction, not a user input
    /// error, and is never recoverable.
    #[error("arena slot {index} written twice")]
    DuplicateSlotWrite {
        /// The offending slot index
        index: usize,
    },

    /// Two hook handlers cannot cooperate on the same element
    #[error("incompatible hooks on element '{element}': {detail}")]
    IncompatibleHooks {
        /// The element carrying the conflicting markers
        element: String,
        /// Policy-provided conflict description
        detail: String,
    },

    /// A service key was published twice within one scope
    #[error("service key '{key}' already published in this scope")]
    DuplicateServiceKey {
        /// The duplicated key
        key: String,
    },

    /// An operation was attempted in the wrong build phase
    #[error("build phase error: {message}")]
    BuildPhase {
        /// What was attempted and why the phase forbids it
        message: String,
    },

    /// A resolved value did not have the expected type
    #[error("type mismatch reading {what}: expected {expected}")]
    TypeMismatch {
        /// What was being read (a slot, a binding key)
        what: String,
        /// The expected type name
        expected: &'static str,
    },

    /// A marker had no registered handler
    #[error("no hook handler registered for marker '{marker}' (available: {available:?})")]
    UnknownHandler {
        /// The unmatched marker kind
        marker: String,
        /// Handler kinds known to the registry
        available: Vec<String>,
    },

    /// Configuration-related error
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal invariant violation
    #[error("internal error: {message}")]
    Internal {
        /// Description of the violated invariant
        message: String,
    },
}

impl Error {
    /// Create a cycle error from a chain of node labels
    pub fn cycle<I, S>(chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Cycle {
            chain: chain.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an unresolved-binding error
    pub fn unresolved<E: Into<String>, K: Into<String>>(element: E, key: K) -> Self {
        Self::UnresolvedBinding {
            element: element.into(),
            key: key.into(),
        }
    }

    /// Create an incompatible-hooks error
    pub fn incompatible<E: Into<String>, D: Into<String>>(element: E, detail: D) -> Self {
        Self::IncompatibleHooks {
            element: element.into(),
            detail: detail.into(),
        }
    }

    /// Create a duplicate-service-key error
    pub fn duplicate_key<S: Into<String>>(key: S) -> Self {
        Self::DuplicateServiceKey { key: key.into() }
    }

    /// Create a type-mismatch error
    pub fn type_mismatch<S: Into<String>>(what: S, expected: &'static str) -> Self {
        Self::TypeMismatch {
            what: what.into(),
            expected,
        }
    }

    /// Create a build-phase error
    pub fn build_phase<S: Into<String>>(message: S) -> Self {
        Self::BuildPhase {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
