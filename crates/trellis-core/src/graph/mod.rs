//! Dependency graph primitives
//!
//! The build-time dependency graph: anything that can supply a value is a
//! [`Producer`]; anything that needs values before it can supply its own is
//! a [`DependencyNode`]. The [`Resolver`] walks the graph in declaration
//! order, detects cycles before any irreversible side effect, and fires
//! each node's finalize callback strictly after its dependencies.
//!
//! ```text
//! Producer ── backing ──▶ DependencyNode ── deps ──▶ Producer ...
//!    │                          │
//!    └── accessor(&Arena)       └── finalize(&mut FinalizeCx)
//! ```

pub mod node;
pub mod producer;
pub mod resolver;

pub use node::{DependencyNode, FinalizeCx, FinalizeFn, NodeId};
pub use producer::{Accessor, Producer, ProducerId, ProducerTable};
pub use resolver::Resolver;

pub use crate::arena::SharedValue;

use crate::error::{Error, Result};

/// The dependency graph for one application build
///
/// Owns every node and producer registered while the container tree is
/// scanned. Insertion order is declaration order and is the order the
/// [`Resolver`] uses for its deterministic walk.
#[derive(Default)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    producers: ProducerTable,
}

impl DependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node, returning its id
    pub fn add_node(&mut self, node: DependencyNode) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Register a producer, returning its id
    pub fn add_producer(&mut self, producer: Producer) -> ProducerId {
        self.producers.add(producer)
    }

    /// Borrow a node
    pub fn node(&self, id: NodeId) -> Result<&DependencyNode> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| Error::internal(format!("unknown node id {}", id.index())))
    }

    /// Mutably borrow a node
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut DependencyNode> {
        self.nodes
            .get_mut(id.index())
            .ok_or_else(|| Error::internal(format!("unknown node id {}", id.index())))
    }

    /// Borrow a producer
    pub fn producer(&self, id: ProducerId) -> Result<&Producer> {
        self.producers.get(id)
    }

    /// The producer table
    pub fn producers(&self) -> &ProducerTable {
        &self.producers
    }

    /// All node ids in declaration order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::new)
    }

    /// Number of registered nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn split(&mut self) -> (&mut [DependencyNode], &ProducerTable) {
        (&mut self.nodes, &self.producers)
    }
}
