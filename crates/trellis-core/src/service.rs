//! Service publication
//!
//! A thin keyed registry used when a producer must be reachable by external
//! key lookup rather than direct graph wiring: the export/import boundary
//! between container scopes. Publication and import are strictly separate
//! from the resolver's internal producer wiring.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::graph::ProducerId;
use crate::key::BindingKey;

/// Who may resolve a published service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Resolvable only inside the publishing scope
    Local,
    /// Importable by other scopes through an explicit import step
    Exported,
}

/// A producer published under a stable key
#[derive(Debug, Clone)]
pub struct ServiceEntry {
    key: BindingKey,
    visibility: Visibility,
    producer: ProducerId,
}

impl ServiceEntry {
    /// The publication key
    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    /// Publication visibility
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// The backing producer
    pub fn producer(&self) -> ProducerId {
        self.producer
    }
}

/// One scope's keyed service registry
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    entries: HashMap<BindingKey, ServiceEntry>,
}

impl ServiceRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a producer under a key
    ///
    /// Fails with [`Error::DuplicateServiceKey`] if the key is already
    /// bound within this scope.
    pub fn publish(
        &mut self,
        key: BindingKey,
        producer: ProducerId,
        visibility: Visibility,
    ) -> Result<()> {
        if self.entries.contains_key(&key) {
            return Err(Error::duplicate_key(key.to_string()));
        }
        self.entries.insert(
            key.clone(),
            ServiceEntry {
                key,
                visibility,
                producer,
            },
        );
        Ok(())
    }

    /// Query the local scope
    ///
    /// Repeated lookups on an unchanged registry return the same entry.
    pub fn lookup(&self, key: &BindingKey) -> Option<&ServiceEntry> {
        self.entries.get(key)
    }

    /// Entries published with [`Visibility::Exported`]
    pub fn exported(&self) -> impl Iterator<Item = &ServiceEntry> {
        self.entries
            .values()
            .filter(|e| e.visibility == Visibility::Exported)
    }

    /// Import another scope's exported entries by key
    ///
    /// The explicit cross-scope path: only exported entries cross, and a
    /// key collision with anything already bound here is an error.
    pub fn import_exported(&mut self, other: &ServiceRegistry) -> Result<()> {
        // Deterministic order keeps the first-reported collision stable.
        let mut imports: Vec<&ServiceEntry> = other.exported().collect();
        imports.sort_by(|a, b| a.key.cmp(&b.key));
        for entry in imports {
            self.publish(entry.key.clone(), entry.producer, Visibility::Local)?;
        }
        Ok(())
    }

    /// Number of published entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is published
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DependencyGraph, Producer};
    use std::sync::Arc;

    fn producer_id(graph: &mut DependencyGraph) -> ProducerId {
        graph.add_producer(Producer::constant(Arc::new(())))
    }

    #[test]
    fn test_duplicate_key_in_scope_fails() {
        let mut graph = DependencyGraph::new();
        let first = producer_id(&mut graph);
        let second = producer_id(&mut graph);

        let mut registry = ServiceRegistry::new();
        let key = BindingKey::named("svc.Mailer");
        registry.publish(key.clone(), first, Visibility::Local).unwrap();
        match registry.publish(key, second, Visibility::Local) {
            Err(Error::DuplicateServiceKey { key }) => assert_eq!(key, "svc.Mailer"),
            other => panic!("Expected DuplicateServiceKey, got {:?}", other),
        }
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let mut graph = DependencyGraph::new();
        let id = producer_id(&mut graph);

        let mut registry = ServiceRegistry::new();
        let key = BindingKey::named("svc.Mailer");
        registry.publish(key.clone(), id, Visibility::Exported).unwrap();

        let first = registry.lookup(&key).unwrap().producer();
        let second = registry.lookup(&key).unwrap().producer();
        assert_eq!(first, second);
        assert_eq!(first, id);
    }

    #[test]
    fn test_only_exported_entries_cross_scopes() {
        let mut graph = DependencyGraph::new();
        let local = producer_id(&mut graph);
        let exported = producer_id(&mut graph);

        let mut publisher = ServiceRegistry::new();
        publisher
            .publish(BindingKey::named("svc.Local"), local, Visibility::Local)
            .unwrap();
        publisher
            .publish(BindingKey::named("svc.Shared"), exported, Visibility::Exported)
            .unwrap();

        let mut importer = ServiceRegistry::new();
        importer.import_exported(&publisher).unwrap();

        assert!(importer.lookup(&BindingKey::named("svc.Local")).is_none());
        assert_eq!(
            importer
                .lookup(&BindingKey::named("svc.Shared"))
                .unwrap()
                .producer(),
            exported
        );
    }
}
