//! Beans
//!
//! A bean is an installable unit of instantiation: its source (a described
//! class, a factory, or a pre-built instance), its instantiation kind, and
//! after wiring, its instance-creation node and producer. A bean has at
//! most one instance-creation node and any number of auxiliary operations
//! (lifecycle callbacks, injectable members).

use crate::arena::{SharedValue, SlotHandle};
use crate::element::ClassDescriptor;
use crate::graph::{Accessor, NodeId, ProducerId};
use crate::key::BindingKey;

/// Identifier of a bean within its container tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BeanId(usize);

impl BeanId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// The underlying table index
    pub fn index(self) -> usize {
        self.0
    }
}

/// How instances of a bean are managed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instantiation {
    /// One instance per container tree, held in the runtime arena
    Singleton,
    /// A caller-owned value the runtime wires but does not manage
    Unmanaged,
    /// No instance at all: only function-style operations
    Stateless,
}

/// Where a bean's value comes from
#[derive(Clone)]
pub enum BeanSource {
    /// A described class whose marked elements drive hook compilation
    Class(ClassDescriptor),
    /// A factory closure producing the instance
    Factory(Accessor),
    /// A pre-built instance
    Instance(SharedValue),
}

impl std::fmt::Debug for BeanSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Class(class) => f.debug_tuple("Class").field(&class.name()).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
            Self::Instance(_) => f.write_str("Instance(..)"),
        }
    }
}

/// An installable unit of instantiation
#[derive(Debug)]
pub struct Bean {
    key: BindingKey,
    kind: Instantiation,
    source: BeanSource,
    creation_node: Option<NodeId>,
    creation_producer: Option<ProducerId>,
    slot: Option<SlotHandle>,
    operations: Vec<usize>,
}

impl Bean {
    /// Declare a bean
    pub fn new(key: BindingKey, kind: Instantiation, source: BeanSource) -> Self {
        Self {
            key,
            kind,
            source,
            creation_node: None,
            creation_producer: None,
            slot: None,
            operations: Vec::new(),
        }
    }

    /// The key this bean's instance answers to
    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    /// Instantiation kind
    pub fn kind(&self) -> Instantiation {
        self.kind
    }

    /// The bean's source descriptor
    pub fn source(&self) -> &BeanSource {
        &self.source
    }

    /// The instance-creation node, once wired
    pub fn creation_node(&self) -> Option<NodeId> {
        self.creation_node
    }

    /// The instance producer, once wired
    pub fn creation_producer(&self) -> Option<ProducerId> {
        self.creation_producer
    }

    /// The reserved arena slot, for singleton beans
    pub fn slot(&self) -> Option<SlotHandle> {
        self.slot
    }

    /// Indices of compiled auxiliary operations
    pub fn operations(&self) -> &[usize] {
        &self.operations
    }

    /// Record the wiring produced by hook compilation
    ///
    /// A bean has at most one instance-creation step; wiring twice is a
    /// defect in the scan. Pre-built instances have a producer but no node.
    pub fn wire_creation(
        &mut self,
        node: Option<NodeId>,
        producer: ProducerId,
        slot: Option<SlotHandle>,
    ) -> crate::error::Result<()> {
        if self.creation_producer.is_some() {
            return Err(crate::error::Error::internal(format!(
                "bean '{}' wired twice",
                self.key
            )));
        }
        self.creation_node = node;
        self.creation_producer = Some(producer);
        self.slot = slot;
        Ok(())
    }

    /// Attach a compiled auxiliary operation
    pub fn add_operation(&mut self, operation: usize) {
        self.operations.push(operation);
    }
}
