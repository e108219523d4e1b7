//! Binding resolution
//!
//! Each parameter of a compiled element resolves to exactly one binding,
//! attempted in priority order: an extension-bound constant, a graph
//! producer matched by key, an invocation-time context value, then the
//! optional/default fallback. A required parameter that reaches the end of
//! the chain fails the build, naming the element and the missing key.

use std::collections::HashMap;

use trellis_core::element::ParamDescriptor;
use trellis_core::error::{Error, Result};
use trellis_core::graph::ProducerId;
use trellis_core::key::BindingKey;
use trellis_core::operation::Binding;

use crate::aggregate::AggregateResult;

/// Key-to-producer index for one build
///
/// Populated as beans and explicit producer registrations declare what
/// they offer; consulted whenever a parameter asks for a key.
#[derive(Debug, Default)]
pub struct ProducerIndex {
    by_key: HashMap<BindingKey, ProducerId>,
}

impl ProducerIndex {
    /// An empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a key to a producer
    ///
    /// A key already bound is a collision between two producers claiming
    /// the same contract.
    pub fn bind(&mut self, key: BindingKey, producer: ProducerId) -> Result<()> {
        if self.by_key.contains_key(&key) {
            return Err(Error::duplicate_key(key.to_string()));
        }
        self.by_key.insert(key, producer);
        Ok(())
    }

    /// Look up the producer for a key
    pub fn get(&self, key: &BindingKey) -> Option<ProducerId> {
        self.by_key.get(key).copied()
    }

    /// Number of bound keys
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Whether no key is bound
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Resolves one element's parameters against the build's bindings
pub struct BindingResolver<'a> {
    aggregate: &'a AggregateResult,
    producers: &'a ProducerIndex,
    /// Context bindings are only legal for operations invoked after the
    /// build; instance creation runs during it, with no caller arguments.
    context_allowed: bool,
}

impl<'a> BindingResolver<'a> {
    /// Resolver for an operation invocable after the build
    pub fn for_operation(aggregate: &'a AggregateResult, producers: &'a ProducerIndex) -> Self {
        Self {
            aggregate,
            producers,
            context_allowed: true,
        }
    }

    /// Resolver for an instance-creation element
    pub fn for_creation(aggregate: &'a AggregateResult, producers: &'a ProducerIndex) -> Self {
        Self {
            aggregate,
            producers,
            context_allowed: false,
        }
    }

    /// Resolve a single parameter
    pub fn resolve(&self, element: &str, param: &ParamDescriptor) -> Result<Binding> {
        let key = param.key();
        if let Some(value) = self.aggregate.constants.get(key) {
            return Ok(Binding::Constant(value.clone()));
        }
        if let Some(producer) = self.producers.get(key) {
            return Ok(Binding::Producer(producer));
        }
        if self.context_allowed && self.aggregate.context_keys.contains(key) {
            return Ok(Binding::Context(key.clone()));
        }
        if param.is_optional() {
            return Ok(Binding::Default);
        }
        Err(Error::unresolved(element, key.to_string()))
    }

    /// Resolve every parameter of an element, in order
    pub fn resolve_all(&self, element: &str, params: &[ParamDescriptor]) -> Result<Vec<Binding>> {
        params
            .iter()
            .map(|param| self.resolve(element, param))
            .collect()
    }
}
