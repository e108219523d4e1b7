//! Hook handler registry
//!
//! Handlers recognize one marker kind each and are keyed by the qualified
//! marker name (`extension.kind`). Built-in and extension handlers register
//! themselves at compile time via the [`HOOK_HANDLERS`] distributed slice;
//! a build may add further handlers at runtime before scanning starts.

use std::collections::HashMap;
use std::sync::Arc;

use trellis_core::element::{ElementDescriptor, Marker};
use trellis_core::error::{Error, Result};

use crate::aggregate::AggregateBuilder;

/// A handler recognizing one marker kind on program elements
pub trait HookHandler: Send + Sync {
    /// The extension owning this handler
    fn extension(&self) -> &'static str;

    /// The qualified marker this handler recognizes, `extension.kind`
    fn marker(&self) -> &'static str;

    /// Contribute to the element's shared aggregate
    ///
    /// Called once per matching marker instance. All handlers matching one
    /// element are collected before any of them runs, and they all share
    /// `builder`.
    fn contribute(
        &self,
        element: &ElementDescriptor,
        marker: &Marker,
        builder: &mut AggregateBuilder,
    ) -> Result<()>;
}

/// Registry entry for compile-time handler registration
///
/// Each handler implementation submits an entry with
/// `#[linkme::distributed_slice(HOOK_HANDLERS)]`.
pub struct HookHandlerEntry {
    /// Qualified marker name, `extension.kind`
    pub marker: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Factory producing the handler instance
    pub factory: fn() -> Arc<dyn HookHandler>,
}

// Auto-collection via linkme - handlers submit entries at compile time
#[linkme::distributed_slice]
pub static HOOK_HANDLERS: [HookHandlerEntry] = [..];

/// List all compile-time registered hook handlers
///
/// Returns (marker, description) tuples; useful for diagnostics and
/// configuration validation.
pub fn list_hook_handlers() -> Vec<(&'static str, &'static str)> {
    HOOK_HANDLERS
        .iter()
        .map(|e| (e.marker, e.description))
        .collect()
}

/// The handler set for one application build
pub struct HookRegistry {
    handlers: HashMap<String, Arc<dyn HookHandler>>,
}

impl HookRegistry {
    /// An empty registry, ignoring the distributed slice
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A registry seeded with every compile-time registered handler
    pub fn with_registered() -> Self {
        let mut registry = Self::empty();
        for entry in HOOK_HANDLERS {
            // Slice entries are static; a marker collision here is a
            // packaging defect, surfaced on first lookup instead.
            registry
                .handlers
                .insert(entry.marker.to_string(), (entry.factory)());
        }
        registry
    }

    /// Register a handler at runtime, before scanning starts
    pub fn register(&mut self, handler: Arc<dyn HookHandler>) -> Result<()> {
        let marker = handler.marker().to_string();
        if self.handlers.contains_key(&marker) {
            return Err(Error::build_phase(format!(
                "hook handler for marker '{}' already registered",
                marker
            )));
        }
        self.handlers.insert(marker, handler);
        Ok(())
    }

    /// Look up the handler for a qualified marker name
    pub fn lookup(&self, marker: &str) -> Option<Arc<dyn HookHandler>> {
        self.handlers.get(marker).cloned()
    }

    /// Look up the handler for a marker, failing with the known kinds
    pub fn require(&self, marker: &Marker) -> Result<Arc<dyn HookHandler>> {
        self.lookup(&marker.qualified())
            .ok_or_else(|| Error::UnknownHandler {
                marker: marker.qualified(),
                available: self.known_markers(),
            })
    }

    /// Qualified marker names known to this registry, sorted
    pub fn known_markers(&self) -> Vec<String> {
        let mut markers: Vec<String> = self.handlers.keys().cloned().collect();
        markers.sort();
        markers
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
