//! Graph resolver and cycle detector
//!
//! Runs in two phases. The detection phase walks every node of a build's
//! dependency graph in declaration order, keeping an explicit visit stack.
//! A dependency already on the stack is a cycle; the reported chain is the
//! stack trimmed to the segment between the repeated node and the top,
//! discarding the tail that entered the cycle from outside it. Nodes whose
//! dependencies are fully visited are appended to the finalize schedule,
//! so for all nodes A, B where A is a (transitive) dependency of B, A is
//! scheduled strictly before B.
//!
//! Only after every node has been visited with no cycle found does the
//! finalize phase fire the scheduled callbacks, in schedule order. A cycle
//! anywhere in the graph therefore aborts the build before any
//! irreversible side effect (an arena write) happens, even in an otherwise
//! valid subgraph. The resolver runs once per application build.

use tracing::{debug, trace};

use crate::arena::Arena;
use crate::error::{Error, Result};
use crate::graph::node::{DependencyNode, FinalizeCx, NodeId};
use crate::graph::producer::ProducerTable;
use crate::graph::DependencyGraph;

/// Single-use resolver for one build's dependency graph
pub struct Resolver<'a> {
    nodes: &'a mut [DependencyNode],
    producers: &'a ProducerTable,
    stack: Vec<NodeId>,
    schedule: Vec<NodeId>,
}

impl<'a> Resolver<'a> {
    /// Resolve every node in `order`, firing finalize callbacks in
    /// dependency order
    ///
    /// `order` is the declaration order produced by the container walk;
    /// nodes reached only through dependencies are scheduled on the way.
    /// No callback fires until the whole graph is proven acyclic.
    pub fn run(graph: &'a mut DependencyGraph, arena: &'a mut Arena, order: &[NodeId]) -> Result<()> {
        let (nodes, producers) = graph.split();
        let mut resolver = Resolver {
            nodes,
            producers,
            stack: Vec::new(),
            schedule: Vec::new(),
        };
        for &id in order {
            resolver.visit(id)?;
        }

        let Resolver {
            nodes,
            producers,
            schedule,
            ..
        } = resolver;
        for id in schedule {
            let node = nodes
                .get_mut(id.index())
                .ok_or_else(|| Error::internal(format!("unknown node id {}", id.index())))?;
            trace!(node = node.label(), "finalizing");
            if let Some(finalize) = node.take_finalize() {
                let mut cx = FinalizeCx::new(arena, producers);
                finalize(&mut cx)?;
            }
        }
        debug!(nodes = order.len(), "dependency graph resolved");
        Ok(())
    }

    /// Detection phase: depth-first visit, appending to the schedule once
    /// every dependency of a node is visited
    fn visit(&mut self, id: NodeId) -> Result<()> {
        if !self.node(id)?.needs_finalize() {
            return Ok(());
        }
        if let Some(position) = self.stack.iter().position(|&on_stack| on_stack == id) {
            // Trim the chain to the cycle proper: everything before the
            // repeated node entered the cycle from outside it.
            let chain: Vec<String> = self.stack[position..]
                .iter()
                .map(|&n| self.nodes[n.index()].label().to_string())
                .collect();
            return Err(Error::cycle(chain));
        }

        self.stack.push(id);
        let dependencies = self.node(id)?.dependencies().to_vec();
        for producer_id in dependencies.into_iter().flatten() {
            if let Some(backing) = self.producers.get(producer_id)?.backing_node() {
                self.visit(backing)?;
            }
        }
        self.stack.pop();

        let node = self
            .nodes
            .get_mut(id.index())
            .ok_or_else(|| Error::internal(format!("unknown node id {}", id.index())))?;
        node.mark_finalized();
        self.schedule.push(id);
        Ok(())
    }

    fn node(&self, id: NodeId) -> Result<&DependencyNode> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| Error::internal(format!("unknown node id {}", id.index())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaLayout;
    use crate::graph::producer::Producer;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn logging_node(label: &'static str, log: &Log) -> DependencyNode {
        let log = Arc::clone(log);
        DependencyNode::new(label).on_resolved(Box::new(move |_| {
            log.lock().unwrap().push(label);
            Ok(())
        }))
    }

    fn unit_producer(node: NodeId) -> Producer {
        Producer::backed(
            Arc::new(|_: &dyn crate::arena::ArenaRead| Ok(Arc::new(()) as crate::arena::SharedValue)),
            node,
        )
    }

    #[test]
    fn test_leaf_before_dependent() {
        let log: Log = Arc::default();
        let mut graph = DependencyGraph::new();

        let x = graph.add_node(logging_node("X", &log));
        let x_producer = graph.add_producer(unit_producer(x));
        let y = graph.add_node(logging_node("Y", &log).with_dependency(Some(x_producer)));

        let mut arena = ArenaLayout::new().build();
        // Declare Y first: the walk must still finalize X before Y.
        Resolver::run(&mut graph, &mut arena, &[y, x]).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["X", "Y"]);
    }

    #[test]
    fn test_node_finalized_once() {
        let log: Log = Arc::default();
        let mut graph = DependencyGraph::new();

        let x = graph.add_node(logging_node("X", &log));
        let x_producer = graph.add_producer(unit_producer(x));
        let a = graph.add_node(logging_node("A", &log).with_dependency(Some(x_producer)));
        let b = graph.add_node(logging_node("B", &log).with_dependency(Some(x_producer)));

        let mut arena = ArenaLayout::new().build();
        Resolver::run(&mut graph, &mut arena, &[a, b, x]).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["X", "A", "B"]);
    }

    #[test]
    fn test_two_node_cycle() {
        let mut graph = DependencyGraph::new();

        let a = graph.add_node(DependencyNode::new("A"));
        let b = graph.add_node(DependencyNode::new("B"));
        let a_producer = graph.add_producer(unit_producer(a));
        let b_producer = graph.add_producer(unit_producer(b));
        graph.node_mut(a).unwrap().push_dependency(Some(b_producer));
        graph.node_mut(b).unwrap().push_dependency(Some(a_producer));

        let mut arena = ArenaLayout::new().build();
        match Resolver::run(&mut graph, &mut arena, &[a, b]) {
            Err(Error::Cycle { chain }) => assert_eq!(chain, vec!["A", "B"]),
            other => panic!("Expected Cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_chain_is_minimal() {
        // A -> B -> C -> B must report exactly [B, C].
        let mut graph = DependencyGraph::new();
        let a = graph.add_node(DependencyNode::new("A"));
        let b = graph.add_node(DependencyNode::new("B"));
        let c = graph.add_node(DependencyNode::new("C"));

        let b_producer = graph.add_producer(unit_producer(b));
        let c_producer = graph.add_producer(unit_producer(c));

        graph.node_mut(a).unwrap().push_dependency(Some(b_producer));
        graph.node_mut(b).unwrap().push_dependency(Some(c_producer));
        graph.node_mut(c).unwrap().push_dependency(Some(b_producer));

        let mut arena = ArenaLayout::new().build();
        match Resolver::run(&mut graph, &mut arena, &[a]) {
            Err(Error::Cycle { chain }) => assert_eq!(chain, vec!["B", "C"]),
            other => panic!("Expected Cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_fires_no_callback_anywhere() {
        // A valid leaf in one component, a cycle in another: the leaf's
        // callback must not run even though its own subgraph is fine.
        let log: Log = Arc::default();
        let mut graph = DependencyGraph::new();

        let leaf = graph.add_node(logging_node("Leaf", &log));
        let a = graph.add_node(DependencyNode::new("A"));
        let b = graph.add_node(DependencyNode::new("B"));
        let a_producer = graph.add_producer(unit_producer(a));
        let b_producer = graph.add_producer(unit_producer(b));
        graph.node_mut(a).unwrap().push_dependency(Some(b_producer));
        graph.node_mut(b).unwrap().push_dependency(Some(a_producer));

        let mut arena = ArenaLayout::new().build();
        match Resolver::run(&mut graph, &mut arena, &[leaf, a, b]) {
            Err(Error::Cycle { .. }) => {}
            other => panic!("Expected Cycle error, got {:?}", other),
        }
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_holes_are_skipped() {
        let log: Log = Arc::default();
        let mut graph = DependencyGraph::new();
        let n = graph.add_node(
            logging_node("N", &log)
                .with_dependency(None)
                .with_dependency(None),
        );

        let mut arena = ArenaLayout::new().build();
        Resolver::run(&mut graph, &mut arena, &[n]).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["N"]);
    }
}
