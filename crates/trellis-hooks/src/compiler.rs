//! Hook compilation
//!
//! Two passes over the container tree's beans. The declare pass registers
//! every bean's instance-creation wiring (node, producer, reserved slot)
//! so that forward references between beans resolve regardless of
//! declaration order. The compile pass then runs the hook protocol on each
//! class-sourced bean: structural analysis, handler aggregation, binding
//! resolution, and operation emission, filling in the dependency edges the
//! resolver will walk.

use std::sync::Arc;

use tracing::{debug, warn};

use trellis_core::arena::ArenaLayout;
use trellis_core::bean::{BeanId, BeanSource, Instantiation};
use trellis_core::container::ContainerTree;
use trellis_core::element::{ClassDescriptor, ElementDescriptor, ElementKind};
use trellis_core::error::{Error, Result};
use trellis_core::graph::{DependencyGraph, DependencyNode, FinalizeFn, NodeId, Producer, ProducerId};
use trellis_core::operation::{Binding, InvocationContext, Operation};

use crate::aggregate::{AggregateBuilder, AggregateResult, CombinePolicy, InvokeMode, SingleOwnerPolicy};
use crate::binding::{BindingResolver, ProducerIndex};
use crate::cache::class_analysis;
use crate::registry::HookRegistry;

/// Compiles marked bean classes into graph-wired operations
pub struct HookCompiler {
    registry: HookRegistry,
    policy: Arc<dyn CombinePolicy>,
    strict_constants: bool,
}

impl HookCompiler {
    /// Compiler with the given handler set and the default combine policy
    pub fn new(registry: HookRegistry) -> Self {
        Self {
            registry,
            policy: Arc::new(SingleOwnerPolicy),
            strict_constants: false,
        }
    }

    /// Replace the combine policy
    pub fn with_policy(mut self, policy: Arc<dyn CombinePolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Fail instead of warning when a bound constant matches no parameter
    pub fn with_strict_constants(mut self, strict: bool) -> Self {
        self.strict_constants = strict;
        self
    }

    /// The handler registry in use
    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Declare pass: register a bean's creation wiring
    ///
    /// Must run for every bean before any [`HookCompiler::compile_bean`]
    /// call, so the producer index covers forward references.
    pub fn declare_bean(
        &self,
        tree: &mut ContainerTree,
        bean_id: BeanId,
        graph: &mut DependencyGraph,
        layout: &mut ArenaLayout,
        index: &mut ProducerIndex,
    ) -> Result<()> {
        let bean = tree.bean(bean_id)?;
        let key = bean.key().clone();
        let kind = bean.kind();
        let source = bean.source().clone();

        match (kind, source) {
            (_, BeanSource::Instance(value)) => {
                let producer = graph.add_producer(Producer::constant(value));
                index.bind(key.clone(), producer)?;
                tree.bean_mut(bean_id)?.wire_creation(None, producer, None)?;
            }
            (Instantiation::Singleton, BeanSource::Factory(factory)) => {
                let slot = layout.reserve();
                let node = graph.add_node(DependencyNode::new(key.to_string()).on_resolved(
                    Box::new(move |cx| {
                        let value = factory(&*cx.arena())?;
                        cx.arena().store(slot, value)
                    }),
                ));
                let producer = graph.add_producer(Producer::slot(slot, node));
                index.bind(key.clone(), producer)?;
                tree.bean_mut(bean_id)?
                    .wire_creation(Some(node), producer, Some(slot))?;
            }
            (Instantiation::Singleton, BeanSource::Class(class)) => {
                if class.constructor().is_none() {
                    return Err(Error::config(format!(
                        "singleton bean '{}' declares class '{}' without a constructor",
                        key,
                        class.name()
                    )));
                }
                let slot = layout.reserve();
                // Dependencies and the finalize callback arrive in the
                // compile pass, once all producers are declared.
                let node = graph.add_node(DependencyNode::new(key.to_string()));
                let producer = graph.add_producer(Producer::slot(slot, node));
                index.bind(key.clone(), producer)?;
                tree.bean_mut(bean_id)?
                    .wire_creation(Some(node), producer, Some(slot))?;
            }
            (Instantiation::Stateless, BeanSource::Class(_)) => {
                // Function-only bean: no instance creation at all.
            }
            (kind, source) => {
                return Err(Error::config(format!(
                    "bean '{}': {:?} instantiation is not valid for {:?} source",
                    key, kind, source
                )));
            }
        }
        debug!(bean = %key, "bean declared");
        Ok(())
    }

    /// Compile pass: run the hook protocol on a class-sourced bean
    pub fn compile_bean(
        &self,
        tree: &mut ContainerTree,
        bean_id: BeanId,
        graph: &mut DependencyGraph,
        layout: &mut ArenaLayout,
        index: &mut ProducerIndex,
        operations: &mut Vec<Operation>,
    ) -> Result<()> {
        let bean = tree.bean(bean_id)?;
        let class = match bean.source() {
            BeanSource::Class(class) => class.clone(),
            _ => return Ok(()),
        };
        let kind = bean.kind();
        let creation_node = bean.creation_node();
        let creation_producer = bean.creation_producer();
        let slot = bean.slot();

        let analysis = class_analysis(&class);
        for element_analysis in &analysis.elements {
            let element = class
                .elements()
                .iter()
                .find(|e| e.name() == element_analysis.name)
                .ok_or_else(|| {
                    Error::internal(format!(
                        "analysis of '{}' names unknown element '{}'",
                        analysis.class, element_analysis.name
                    ))
                })?;
            let path = element_analysis.path.clone();
            let aggregate = self.aggregate_element(&path, element)?;

            if element.kind() == ElementKind::Constructor {
                if kind == Instantiation::Stateless {
                    continue;
                }
                self.wire_creation(&path, &class, element, &aggregate, graph, index, creation_node, slot)?;
                continue;
            }

            match aggregate.claim().map(|c| c.mode.clone()) {
                Some(InvokeMode::PostConstruct) => {
                    let creation_producer = creation_producer.ok_or_else(|| {
                        Error::config(format!(
                            "post-construct element '{}' on a bean without instance creation",
                            path
                        ))
                    })?;
                    let extension = aggregate.claim().map(|c| c.extension.clone()).unwrap_or_default();
                    let operation_index = self.emit_stored_operation(
                        &path,
                        &extension,
                        element,
                        &aggregate,
                        graph,
                        Some(creation_producer),
                        StoreTarget::Discard,
                        layout,
                        index,
                        operations,
                    )?;
                    tree.bean_mut(bean_id)?.add_operation(operation_index);
                }
                Some(InvokeMode::Produces { key }) => {
                    let extension = aggregate.claim().map(|c| c.extension.clone()).unwrap_or_default();
                    let operation_index = self.emit_stored_operation(
                        &path,
                        &extension,
                        element,
                        &aggregate,
                        graph,
                        None,
                        StoreTarget::Publish(key),
                        layout,
                        index,
                        operations,
                    )?;
                    tree.bean_mut(bean_id)?.add_operation(operation_index);
                }
                None => {
                    // Contribution-only markers: constants and context
                    // declarations were folded into the aggregate of the
                    // claiming element, nothing to emit here.
                }
            }
        }
        Ok(())
    }

    /// Compile a free-standing operation request against the current build
    ///
    /// The deferred-contract path: the operation is compiled now, wired
    /// into the graph as a consumer (a no-op node depending on its
    /// producer bindings, so cycle detection covers it), and becomes
    /// invocable once the build succeeds.
    pub fn compile_operation_request(
        &self,
        class: &ClassDescriptor,
        element: &ElementDescriptor,
        graph: &mut DependencyGraph,
        index: &ProducerIndex,
        operations: &mut Vec<Operation>,
    ) -> Result<usize> {
        let path = class.path(element);
        let aggregate = self.aggregate_element(&path, element)?;
        let resolver = BindingResolver::for_operation(&aggregate, index);
        let bindings = resolver.resolve_all(&path, element.params())?;
        let body = require_body(&path, element)?;

        let dependencies = producer_holes(&bindings);
        graph.add_node(DependencyNode::new(path.clone()).with_dependencies(dependencies));

        let extension = aggregate
            .claim()
            .map(|c| c.extension.clone())
            .unwrap_or_else(|| "core".to_string());
        let operation = Operation::new(path, extension, bindings, body);
        operations.push(operation);
        Ok(operations.len() - 1)
    }

    /// Collect every matching handler for an element, then run them all
    /// against one shared aggregate builder
    fn aggregate_element(
        &self,
        path: &str,
        element: &ElementDescriptor,
    ) -> Result<AggregateResult> {
        let mut matched = Vec::with_capacity(element.markers().len());
        for marker in element.markers() {
            matched.push((self.registry.require(marker)?, marker));
        }

        let mut builder = AggregateBuilder::new(path, element);
        for (handler, marker) in matched {
            handler.contribute(element, marker, &mut builder)?;
        }
        let aggregate = builder.seal(self.policy.as_ref())?;
        self.check_unused_constants(path, element, &aggregate)?;
        Ok(aggregate)
    }

    /// Flag constants bound by a handler that match no parameter of the
    /// element, a symptom of a mistyped key in the marker
    fn check_unused_constants(
        &self,
        path: &str,
        element: &ElementDescriptor,
        aggregate: &AggregateResult,
    ) -> Result<()> {
        let mut unused: Vec<String> = aggregate
            .constants
            .keys()
            .filter(|key| !element.params().iter().any(|p| p.key() == *key))
            .map(ToString::to_string)
            .collect();
        if unused.is_empty() {
            return Ok(());
        }
        unused.sort();
        if self.strict_constants {
            return Err(Error::config(format!(
                "element '{}' binds constants matching no parameter: {}",
                path,
                unused.join(", ")
            )));
        }
        warn!(element = path, constants = ?unused, "bound constants match no parameter");
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn wire_creation(
        &self,
        path: &str,
        class: &ClassDescriptor,
        element: &ElementDescriptor,
        aggregate: &AggregateResult,
        graph: &mut DependencyGraph,
        index: &ProducerIndex,
        creation_node: Option<NodeId>,
        slot: Option<trellis_core::arena::SlotHandle>,
    ) -> Result<()> {
        let node = creation_node.ok_or_else(|| {
            Error::internal(format!("constructor '{}' compiled before declare pass", path))
        })?;
        let slot = slot.ok_or_else(|| {
            Error::internal(format!("constructor '{}' has no reserved slot", path))
        })?;

        let resolver = BindingResolver::for_creation(aggregate, index);
        let bindings = resolver.resolve_all(path, element.params())?;
        let body = require_body(path, element)?;

        let operation = Operation::new(path, "core", bindings.clone(), body);
        let class_name = class.name().to_string();
        let finalize: FinalizeFn = Box::new(move |cx| {
            let value = cx.invoke(&operation, &InvocationContext::new())?.ok_or_else(|| {
                Error::internal(format!("constructor of '{}' produced no value", class_name))
            })?;
            cx.arena().store(slot, value)
        });

        let node_ref = graph.node_mut(node)?;
        for dependency in producer_holes(&bindings) {
            node_ref.push_dependency(dependency);
        }
        node_ref.set_finalize(finalize);
        Ok(())
    }

    /// Emit an operation that runs once during arena population
    #[allow(clippy::too_many_arguments)]
    fn emit_stored_operation(
        &self,
        path: &str,
        extension: &str,
        element: &ElementDescriptor,
        aggregate: &AggregateResult,
        graph: &mut DependencyGraph,
        after: Option<ProducerId>,
        target: StoreTarget,
        layout: &mut ArenaLayout,
        index: &mut ProducerIndex,
        operations: &mut Vec<Operation>,
    ) -> Result<usize> {
        let resolver = BindingResolver::for_creation(aggregate, index);
        let bindings = resolver.resolve_all(path, element.params())?;
        let body = require_body(path, element)?;

        let mut dependencies = producer_holes(&bindings);
        if let Some(after) = after {
            // Ordering edge: run strictly after the instance exists.
            dependencies.push(Some(after));
        }

        match target {
            StoreTarget::Discard => {
                let operation =
                    Operation::new(path, extension, bindings, body).discarding_result();
                let runner = operation.clone();
                let finalize: FinalizeFn = Box::new(move |cx| {
                    cx.invoke(&runner, &InvocationContext::new())?;
                    Ok(())
                });
                graph.add_node(
                    DependencyNode::new(path)
                        .with_dependencies(dependencies)
                        .on_resolved(finalize),
                );
                operations.push(operation);
            }
            StoreTarget::Publish(key) => {
                let slot = layout.reserve();
                let operation = Operation::new(path, extension, bindings, body);
                let runner = operation.clone();
                let finalize: FinalizeFn = Box::new(move |cx| {
                    let value =
                        cx.invoke(&runner, &InvocationContext::new())?.ok_or_else(|| {
                            Error::internal(format!(
                                "producer operation '{}' yielded no value",
                                runner.target()
                            ))
                        })?;
                    cx.arena().store(slot, value)
                });
                let node = graph.add_node(
                    DependencyNode::new(path)
                        .with_dependencies(dependencies)
                        .on_resolved(finalize),
                );
                let producer = graph.add_producer(Producer::slot(slot, node));
                index.bind(key, producer)?;
                operations.push(operation);
            }
        }
        Ok(operations.len() - 1)
    }
}

enum StoreTarget {
    Discard,
    Publish(trellis_core::key::BindingKey),
}

fn producer_holes(bindings: &[Binding]) -> Vec<Option<ProducerId>> {
    bindings
        .iter()
        .map(|binding| match binding {
            Binding::Producer(id) => Some(*id),
            _ => None,
        })
        .collect()
}

fn require_body(
    path: &str,
    element: &ElementDescriptor,
) -> Result<trellis_core::element::ElementBody> {
    element
        .body()
        .cloned()
        .ok_or_else(|| Error::config(format!("element '{}' has no callable body", path)))
}
