//! Trellis core layer
//!
//! The build-time model of the IoC runtime: binding keys, the write-once
//! runtime arena, dependency-graph primitives, the graph resolver with cycle
//! detection, the bean/container model, element descriptors, compiled
//! operations, and the service publication registry.
//!
//! This crate is a pure library. It performs no IO, holds no global state,
//! and is consumed by the hook protocol (`trellis-hooks`) and the build
//! orchestrator (`trellis-runtime`).

pub mod arena;
pub mod bean;
pub mod container;
pub mod element;
pub mod error;
pub mod graph;
pub mod key;
pub mod operation;
pub mod service;

pub use arena::{Arena, ArenaLayout, ArenaRead, FrozenArena, SlotHandle};
pub use bean::{Bean, BeanId, BeanSource, Instantiation};
pub use container::{Container, ContainerId, ContainerTree};
pub use element::{
    ClassDescriptor, ElementBody, ElementDescriptor, ElementKind, Marker, ParamDescriptor,
};
pub use error::{Error, Result};
pub use graph::{
    Accessor, DependencyGraph, DependencyNode, FinalizeCx, FinalizeFn, NodeId, Producer,
    ProducerId, ProducerTable, Resolver, SharedValue,
};
pub use key::BindingKey;
pub use operation::{Binding, InvocationContext, Operation};
pub use service::{ServiceEntry, ServiceRegistry, Visibility};
