//! Dependency nodes
//!
//! A [`DependencyNode`] is anything requiring resolved values before it can
//! produce its own: a bean instance awaiting constructor arguments, an
//! operation with graph-bound parameters. Dependencies are an ordered list
//! of producer references that may contain holes for optional slots.

use crate::arena::Arena;
use crate::error::Result;
use crate::graph::producer::{ProducerId, ProducerTable};

/// Identifier of a registered node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// The underlying graph index
    pub fn index(self) -> usize {
        self.0
    }
}

/// Context handed to a node's finalize callback
///
/// Gives the callback read access to every producer (its dependencies are
/// finalized by this point) and write access to the arena.
pub struct FinalizeCx<'a> {
    arena: &'a mut Arena,
    producers: &'a ProducerTable,
}

impl<'a> FinalizeCx<'a> {
    pub(crate) fn new(arena: &'a mut Arena, producers: &'a ProducerTable) -> Self {
        Self { arena, producers }
    }

    /// The arena, for slot reads and the node's own store
    pub fn arena(&mut self) -> &mut Arena {
        self.arena
    }

    /// Produce a dependency's value
    pub fn supply(&self, id: ProducerId) -> Result<crate::arena::SharedValue> {
        self.producers.get(id)?.access(&*self.arena)
    }

    /// Invoke a compiled operation against the populating arena
    pub fn invoke(
        &mut self,
        operation: &crate::operation::Operation,
        ctx: &crate::operation::InvocationContext,
    ) -> Result<Option<crate::arena::SharedValue>> {
        operation.invoke(&*self.arena, self.producers, ctx)
    }
}

/// Callback fired once all of a node's dependencies are finalized
pub type FinalizeFn = Box<dyn FnOnce(&mut FinalizeCx<'_>) -> Result<()> + Send>;

/// Anything requiring resolved values before use
pub struct DependencyNode {
    label: String,
    dependencies: Vec<Option<ProducerId>>,
    needs_finalize: bool,
    finalize: Option<FinalizeFn>,
}

impl DependencyNode {
    /// Create a node with a diagnostic label
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            dependencies: Vec::new(),
            needs_finalize: true,
            finalize: None,
        }
    }

    /// Append a dependency; `None` leaves a hole for an optional slot
    pub fn with_dependency(mut self, producer: Option<ProducerId>) -> Self {
        self.dependencies.push(producer);
        self
    }

    /// Replace the full dependency list
    pub fn with_dependencies(mut self, producers: Vec<Option<ProducerId>>) -> Self {
        self.dependencies = producers;
        self
    }

    /// Append a dependency after construction
    ///
    /// Needed when two nodes reference each other's producers, so neither
    /// can carry the full list at construction time.
    pub fn push_dependency(&mut self, producer: Option<ProducerId>) {
        self.dependencies.push(producer);
    }

    /// Install the finalize callback
    pub fn on_resolved(mut self, finalize: FinalizeFn) -> Self {
        self.finalize = Some(finalize);
        self
    }

    /// Install the finalize callback after construction
    ///
    /// Used when the callback closes over wiring (the node's own producer,
    /// a reserved slot) that only exists once the node is registered.
    pub fn set_finalize(&mut self, finalize: FinalizeFn) {
        self.finalize = Some(finalize);
    }

    /// Diagnostic label, used in cycle reports
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The ordered dependency list
    pub fn dependencies(&self) -> &[Option<ProducerId>] {
        &self.dependencies
    }

    /// Whether the node still awaits finalization
    pub fn needs_finalize(&self) -> bool {
        self.needs_finalize
    }

    pub(crate) fn mark_finalized(&mut self) {
        self.needs_finalize = false;
    }

    pub(crate) fn take_finalize(&mut self) -> Option<FinalizeFn> {
        self.finalize.take()
    }
}

impl std::fmt::Debug for DependencyNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyNode")
            .field("label", &self.label)
            .field("dependencies", &self.dependencies)
            .field("needs_finalize", &self.needs_finalize)
            .finish()
    }
}
