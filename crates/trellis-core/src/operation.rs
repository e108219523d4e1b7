//! Compiled operations
//!
//! An [`Operation`] is a bound, invocable unit: a target element, its
//! resolved binding list, and the element's callable. Bindings were fixed
//! at build time; only [`Binding::Context`] values are looked up at
//! invocation time, from the caller-supplied [`InvocationContext`].

use std::collections::HashMap;

use crate::arena::{ArenaRead, SharedValue};
use crate::element::ElementBody;
use crate::error::{Error, Result};
use crate::graph::{ProducerId, ProducerTable};
use crate::key::BindingKey;

/// How one parameter of an operation's target is satisfied
#[derive(Clone)]
pub enum Binding {
    /// A build-time constant bound by an extension
    Constant(SharedValue),
    /// A graph producer matched by key
    Producer(ProducerId),
    /// A value supplied only at invocation time
    Context(BindingKey),
    /// Optional parameter left to its default
    Default,
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constant(_) => f.write_str("Constant(..)"),
            Self::Producer(id) => f.debug_tuple("Producer").field(id).finish(),
            Self::Context(key) => f.debug_tuple("Context").field(&key.to_string()).finish(),
            Self::Default => f.write_str("Default"),
        }
    }
}

/// Values supplied by the caller at invocation time
#[derive(Default)]
pub struct InvocationContext {
    values: HashMap<BindingKey, SharedValue>,
}

impl InvocationContext {
    /// An empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply a value under a key
    pub fn provide(mut self, key: BindingKey, value: SharedValue) -> Self {
        self.values.insert(key, value);
        self
    }

    /// Look up a supplied value
    pub fn get(&self, key: &BindingKey) -> Option<SharedValue> {
        self.values.get(key).cloned()
    }
}

/// A bound, invocable unit compiled from a marked element
#[derive(Clone)]
pub struct Operation {
    target: String,
    extension: String,
    bindings: Vec<Binding>,
    body: ElementBody,
    discard_result: bool,
}

impl Operation {
    /// Assemble a compiled operation
    pub fn new(
        target: impl Into<String>,
        extension: impl Into<String>,
        bindings: Vec<Binding>,
        body: ElementBody,
    ) -> Self {
        Self {
            target: target.into(),
            extension: extension.into(),
            bindings,
            body,
            discard_result: false,
        }
    }

    /// Discard the target's return value on invocation
    pub fn discarding_result(mut self) -> Self {
        self.discard_result = true;
        self
    }

    /// The element this operation invokes, `Class#element`
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The extension that requested the operation
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// The resolved binding list, one per parameter
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Invoke the target with all bindings resolved
    ///
    /// Fails if a [`Binding::Context`] key is missing from `ctx`; graph
    /// bindings read through `producers` against `arena`.
    pub fn invoke(
        &self,
        arena: &dyn ArenaRead,
        producers: &ProducerTable,
        ctx: &InvocationContext,
    ) -> Result<Option<SharedValue>> {
        let mut args = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let arg = match binding {
                Binding::Constant(value) => Some(value.clone()),
                Binding::Producer(id) => Some(producers.get(*id)?.access(arena)?),
                Binding::Context(key) => Some(
                    ctx.get(key)
                        .ok_or_else(|| Error::unresolved(&self.target, key.to_string()))?,
                ),
                Binding::Default => None,
            };
            args.push(arg);
        }
        let result = (self.body)(&args)?;
        Ok(if self.discard_result {
            None
        } else {
            Some(result)
        })
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("target", &self.target)
            .field("extension", &self.extension)
            .field("bindings", &self.bindings)
            .field("discard_result", &self.discard_result)
            .finish()
    }
}
