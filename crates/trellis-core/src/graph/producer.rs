//! Producers
//!
//! A [`Producer`] is anything that can supply a value: a constant, a
//! populated arena slot, or the result of an operation. Producers whose
//! value itself requires resolved dependencies carry a backing node id,
//! wiring them into cycle detection and finalize ordering.

use std::sync::Arc;

use crate::arena::{ArenaRead, SharedValue, SlotHandle};
use crate::error::{Error, Result};
use crate::graph::node::NodeId;

/// Accessor closure: given the arena, yield the produced value
pub type Accessor = Arc<dyn Fn(&dyn ArenaRead) -> Result<SharedValue> + Send + Sync>;

/// Identifier of a registered producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProducerId(usize);

impl ProducerId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// The underlying table index
    pub fn index(self) -> usize {
        self.0
    }
}

/// Anything that can supply a value to a dependent
#[derive(Clone)]
pub struct Producer {
    accessor: Accessor,
    node: Option<NodeId>,
}

impl Producer {
    /// A leaf producer: no backing node, value available unconditionally
    pub fn leaf(accessor: Accessor) -> Self {
        Self {
            accessor,
            node: None,
        }
    }

    /// A constant producer for an already-resolved value
    pub fn constant(value: SharedValue) -> Self {
        Self::leaf(Arc::new(move |_: &dyn ArenaRead| Ok(value.clone())))
    }

    /// A producer backed by a dependency node
    ///
    /// The accessor must only run after the backing node has finalized.
    pub fn backed(accessor: Accessor, node: NodeId) -> Self {
        Self {
            accessor,
            node: Some(node),
        }
    }

    /// A producer reading a reserved arena slot, backed by the node that
    /// populates the slot
    pub fn slot(slot: SlotHandle, node: NodeId) -> Self {
        Self::backed(
            Arc::new(move |arena: &dyn ArenaRead| {
                arena.read_slot(slot).ok_or_else(|| {
                    Error::internal(format!(
                        "slot {} read before its node finalized",
                        slot.index()
                    ))
                })
            }),
            node,
        )
    }

    /// The backing node, if producing requires resolved dependencies
    pub fn backing_node(&self) -> Option<NodeId> {
        self.node
    }

    /// Produce the value
    pub fn access(&self, arena: &dyn ArenaRead) -> Result<SharedValue> {
        (self.accessor)(arena)
    }
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer").field("node", &self.node).finish()
    }
}

/// Table of all producers registered for one build
#[derive(Debug, Default)]
pub struct ProducerTable {
    producers: Vec<Producer>,
}

impl ProducerTable {
    /// Register a producer
    pub fn add(&mut self, producer: Producer) -> ProducerId {
        let id = ProducerId::new(self.producers.len());
        self.producers.push(producer);
        id
    }

    /// Borrow a producer
    pub fn get(&self, id: ProducerId) -> Result<&Producer> {
        self.producers
            .get(id.index())
            .ok_or_else(|| Error::internal(format!("unknown producer id {}", id.index())))
    }

    /// Number of registered producers
    pub fn len(&self) -> usize {
        self.producers.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaLayout;

    #[test]
    fn test_constant_producer_is_leaf() {
        let producer = Producer::constant(Arc::new(5u32));
        assert!(producer.backing_node().is_none());

        let arena = ArenaLayout::new().build();
        let value = producer.access(&arena).unwrap();
        assert_eq!(*value.downcast::<u32>().unwrap(), 5);
    }

    #[test]
    fn test_slot_producer_reads_populated_slot() {
        let mut layout = ArenaLayout::new();
        let slot = layout.reserve();
        let mut arena = layout.build();
        arena.store(slot, Arc::new("ready".to_string())).unwrap();

        let mut table = ProducerTable::default();
        let node = NodeId::new(0);
        let id = table.add(Producer::slot(slot, node));
        let value = table.get(id).unwrap().access(&arena).unwrap();
        assert_eq!(*value.downcast::<String>().unwrap(), "ready");
    }

    #[test]
    fn test_slot_producer_fails_before_write() {
        let mut layout = ArenaLayout::new();
        let slot = layout.reserve();
        let arena = layout.build();

        let producer = Producer::slot(slot, NodeId::new(0));
        assert!(producer.access(&arena).is_err());
    }
}
