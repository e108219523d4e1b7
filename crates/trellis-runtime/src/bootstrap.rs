//! Application bootstrap
//!
//! [`AppBuilder`] collects containers, beans, handlers, free producers,
//! operation requests, and service exports, then compiles everything in
//! one `build` call. The build consumes the builder, so nothing can be
//! registered once population has started, and the resulting [`App`] is
//! read-only by construction.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use trellis_core::arena::{ArenaLayout, FrozenArena, SharedValue};
use trellis_core::bean::Bean;
use trellis_core::container::{ContainerId, ContainerTree};
use trellis_core::element::{ClassDescriptor, ElementDescriptor};
use trellis_core::error::{Error, Result};
use trellis_core::graph::{Accessor, DependencyGraph, NodeId, Producer, Resolver};
use trellis_core::key::BindingKey;
use trellis_core::operation::{InvocationContext, Operation};
use trellis_core::service::{ServiceEntry, ServiceRegistry, Visibility};
use trellis_hooks::aggregate::CombinePolicy;
use trellis_hooks::binding::ProducerIndex;
use trellis_hooks::compiler::HookCompiler;
use trellis_hooks::registry::{HookHandler, HookRegistry};

use crate::config::RuntimeConfig;

/// Ticket for a producer registered before the build
///
/// Redeem it against the built [`App`] with [`App::value_of`].
#[derive(Debug, Clone, Copy)]
pub struct ProducerHandle {
    producer: trellis_core::graph::ProducerId,
}

/// Ticket for an operation requested before the build
///
/// The slot is filled during [`AppBuilder::build`]; invoking through a
/// handle whose build never ran is a [`Error::BuildPhase`] error.
#[derive(Debug, Clone)]
pub struct OperationHandle {
    slot: Arc<OnceCell<usize>>,
}

struct OperationRequest {
    class: ClassDescriptor,
    element: ElementDescriptor,
    slot: Arc<OnceCell<usize>>,
}

/// Collects the application definition ahead of the build
pub struct AppBuilder {
    config: RuntimeConfig,
    tree: ContainerTree,
    registry: HookRegistry,
    policy: Option<Arc<dyn CombinePolicy>>,
    graph: DependencyGraph,
    layout: ArenaLayout,
    index: ProducerIndex,
    operations: Vec<Operation>,
    requests: Vec<OperationRequest>,
    exports: Vec<(BindingKey, Visibility)>,
}

impl AppBuilder {
    /// Builder with default configuration and the statically registered
    /// handler set
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Builder driven by the given configuration
    pub fn with_config(config: RuntimeConfig) -> Self {
        let tree = ContainerTree::new(config.build.root_container.clone());
        Self {
            config,
            tree,
            registry: HookRegistry::with_registered(),
            policy: None,
            graph: DependencyGraph::new(),
            layout: ArenaLayout::new(),
            index: ProducerIndex::new(),
            operations: Vec::new(),
            requests: Vec::new(),
            exports: Vec::new(),
        }
    }

    /// The root container
    pub fn root(&self) -> ContainerId {
        self.tree.root()
    }

    /// Add a child container under `parent`
    pub fn add_container(
        &mut self,
        parent: ContainerId,
        name: impl Into<String>,
    ) -> Result<ContainerId> {
        self.tree.add_child(parent, name)
    }

    /// Install a bean definition into a container
    pub fn install(&mut self, container: ContainerId, bean: Bean) -> Result<trellis_core::bean::BeanId> {
        self.tree.install_bean(container, bean)
    }

    /// Activate an extension on a container
    pub fn activate_extension(
        &mut self,
        container: ContainerId,
        extension: impl Into<String>,
    ) -> Result<()> {
        self.tree.activate_extension(container, extension)
    }

    /// Register a hook handler beyond the statically discovered set
    pub fn register_handler(&mut self, handler: Arc<dyn HookHandler>) -> Result<()> {
        self.registry.register(handler)
    }

    /// Replace the hook combine policy
    pub fn with_policy(mut self, policy: Arc<dyn CombinePolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Register a free-standing producer under a key
    ///
    /// The accessor runs against the arena on every read; it carries no
    /// graph node, so it cannot participate in ordering.
    pub fn register_producer(
        &mut self,
        key: BindingKey,
        accessor: Accessor,
    ) -> Result<ProducerHandle> {
        let producer = self.graph.add_producer(Producer::leaf(accessor));
        self.index.bind(key, producer)?;
        Ok(ProducerHandle { producer })
    }

    /// Register a constant producer under a key
    pub fn register_constant(
        &mut self,
        key: BindingKey,
        value: SharedValue,
    ) -> Result<ProducerHandle> {
        let producer = self.graph.add_producer(Producer::constant(value));
        self.index.bind(key, producer)?;
        Ok(ProducerHandle { producer })
    }

    /// Request an operation over a marked element
    ///
    /// The element is compiled during the build against the full producer
    /// index; the handle becomes invocable on the built [`App`].
    pub fn request_operation(
        &mut self,
        class: ClassDescriptor,
        element: ElementDescriptor,
    ) -> OperationHandle {
        let slot = Arc::new(OnceCell::new());
        self.requests.push(OperationRequest {
            class,
            element,
            slot: Arc::clone(&slot),
        });
        OperationHandle { slot }
    }

    /// Publish a bound key as a service after the build
    pub fn export(&mut self, key: BindingKey, visibility: Visibility) {
        self.exports.push((key, visibility));
    }

    /// Compile and populate the application
    ///
    /// Declares every bean, runs the hook protocol, compiles deferred
    /// operation requests, publishes services, then resolves the
    /// dependency graph into the arena and freezes it.
    pub fn build(mut self) -> Result<App> {
        let mut compiler = HookCompiler::new(self.registry)
            .with_strict_constants(self.config.build.strict_unused_constants);
        if let Some(policy) = self.policy {
            compiler = compiler.with_policy(policy);
        }

        let bean_order = self.tree.beans_in_walk_order();
        for bean_id in &bean_order {
            compiler.declare_bean(
                &mut self.tree,
                *bean_id,
                &mut self.graph,
                &mut self.layout,
                &mut self.index,
            )?;
        }
        for bean_id in &bean_order {
            compiler.compile_bean(
                &mut self.tree,
                *bean_id,
                &mut self.graph,
                &mut self.layout,
                &mut self.index,
                &mut self.operations,
            )?;
        }
        debug!(
            beans = bean_order.len(),
            nodes = self.graph.node_count(),
            "bean compilation complete"
        );

        for request in &self.requests {
            let operation = compiler.compile_operation_request(
                &request.class,
                &request.element,
                &mut self.graph,
                &self.index,
                &mut self.operations,
            )?;
            // Fresh cell per request, so the set cannot collide.
            let _ = request.slot.set(operation);
        }

        let mut services = ServiceRegistry::new();
        for (key, visibility) in self.exports {
            let producer = self.index.get(&key).ok_or_else(|| {
                Error::config(format!("exported key '{}' is not bound", key))
            })?;
            services.publish(key, producer, visibility)?;
        }

        let mut arena = self.layout.build();
        let order: Vec<NodeId> = self.graph.node_ids().collect();
        if let Err(e) = Resolver::run(&mut self.graph, &mut arena, &order) {
            if let Error::Cycle { chain } = &e {
                let limit = self.config.build.cycle_report_limit;
                let mut shown = chain
                    .iter()
                    .take(limit)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(" -> ");
                if chain.len() > limit {
                    shown.push_str(" ...");
                }
                warn!(cycle = %shown, "dependency cycle aborted the build");
            }
            return Err(e);
        }

        let arena = arena.freeze()?;
        info!(
            slots = arena.len(),
            operations = self.operations.len(),
            services = services.len(),
            "application built"
        );
        Ok(App {
            arena,
            graph: self.graph,
            index: self.index,
            operations: self.operations,
            services,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A fully built, read-only application
pub struct App {
    arena: FrozenArena,
    graph: DependencyGraph,
    index: ProducerIndex,
    operations: Vec<Operation>,
    services: ServiceRegistry,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App").finish_non_exhaustive()
    }
}

impl App {
    /// Read the raw value bound under a key
    pub fn resolve(&self, key: &BindingKey) -> Result<SharedValue> {
        let producer = self
            .index
            .get(key)
            .ok_or_else(|| Error::unresolved("<lookup>", key.to_string()))?;
        self.graph.producer(producer)?.access(&self.arena)
    }

    /// Read and downcast the value bound under a key
    pub fn get<T: std::any::Any + Send + Sync>(&self, key: &BindingKey) -> Result<Arc<T>> {
        self.resolve(key)?.downcast::<T>().map_err(|_| {
            Error::type_mismatch(format!("binding '{}'", key), std::any::type_name::<T>())
        })
    }

    /// Read the value behind a pre-build producer handle
    pub fn value_of(&self, handle: &ProducerHandle) -> Result<SharedValue> {
        self.graph.producer(handle.producer)?.access(&self.arena)
    }

    /// Invoke a compiled operation with the given context
    pub fn invoke(
        &self,
        handle: &OperationHandle,
        ctx: &InvocationContext,
    ) -> Result<Option<SharedValue>> {
        let operation = handle
            .slot
            .get()
            .and_then(|i| self.operations.get(*i))
            .ok_or_else(|| {
                Error::build_phase("operation handle was not compiled by this build")
            })?;
        operation.invoke(&self.arena, self.graph.producers(), ctx)
    }

    /// Query a published service
    pub fn lookup_service(&self, key: &BindingKey) -> Option<&ServiceEntry> {
        self.services.lookup(key)
    }

    /// The published service registry
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// Number of populated arena slots
    pub fn slot_count(&self) -> usize {
        self.arena.len()
    }
}
