//! Graph construction and validation.
//!
//! Execution order is computed once at build time with Kahn's algorithm.
//! Ready nodes are taken in declaration order, so the same declarations
//! always produce the same order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::{GraphError, RenderResult};

use super::node::{PortName, RenderNode, Resolution};

/// Handle to a node inside a builder or built graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Declaration index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One input binding: `input` of the owning node reads `source.output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// Input port on the consuming node.
    pub input: PortName,
    /// Producing node.
    pub source: NodeId,
    /// Output port on the producing node.
    pub output: PortName,
}

pub(crate) struct GraphNode {
    pub(crate) node: Box<dyn RenderNode>,
    pub(crate) bindings: Vec<Binding>,
}

/// Collects nodes and bindings.
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<GraphNode>,
}

impl GraphBuilder {
    /// Empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node.
    ///
    /// # Errors
    ///
    /// Fails if another node already uses the same name.
    pub fn add(&mut self, node: impl RenderNode + 'static) -> RenderResult<NodeId> {
        self.add_boxed(Box::new(node))
    }

    /// Adds a boxed node.
    ///
    /// # Errors
    ///
    /// Fails if another node already uses the same name.
    pub fn add_boxed(&mut self, node: Box<dyn RenderNode>) -> RenderResult<NodeId> {
        if self.nodes.iter().any(|n| n.node.name() == node.name()) {
            return Err(GraphError::DuplicateNode(node.name().to_string()).into());
        }
        self.nodes.push(GraphNode {
            node,
            bindings: Vec::new(),
        });
        Ok(NodeId(self.nodes.len() - 1))
    }

    /// Binds `target.input` to `source.output`.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles or ports, or an input bound twice.
    pub fn bind(
        &mut self,
        target: NodeId,
        input: PortName,
        source: NodeId,
        output: PortName,
    ) -> RenderResult<()> {
        let source_node = self
            .nodes
            .get(source.0)
            .ok_or(GraphError::UnknownNode(source.0))?;
        if !source_node.node.outputs().iter().any(|o| o.name == output) {
            return Err(GraphError::UnknownOutput {
                node: source_node.node.name().to_string(),
                port: output.to_string(),
            }
            .into());
        }

        let target_node = self
            .nodes
            .get_mut(target.0)
            .ok_or(GraphError::UnknownNode(target.0))?;
        let name = target_node.node.name().to_string();
        if !target_node.node.inputs().contains(&input) {
            return Err(GraphError::UnknownInput {
                node: name,
                port: input.to_string(),
            }
            .into());
        }
        if target_node.bindings.iter().any(|b| b.input == input) {
            return Err(GraphError::AlreadyBound {
                node: name,
                port: input.to_string(),
            }
            .into());
        }

        target_node.bindings.push(Binding {
            input,
            source,
            output,
        });
        Ok(())
    }

    /// Validates the graph and computes its execution order.
    ///
    /// # Errors
    ///
    /// Fails for unbound inputs, an inheriting node without inputs, or a
    /// cycle.
    pub fn build(self) -> RenderResult<CompositeGraph> {
        for n in &self.nodes {
            let inputs = n.node.inputs();
            if n.node.resolution() == Resolution::Inherit && inputs.is_empty() {
                return Err(GraphError::NoResolutionSource(n.node.name().to_string()).into());
            }
            if let Some(port) = inputs
                .iter()
                .find(|port| !n.bindings.iter().any(|b| b.input == **port))
            {
                return Err(GraphError::Unbound {
                    node: n.node.name().to_string(),
                    port: (*port).to_string(),
                }
                .into());
            }
        }

        let order = topological_order(&self.nodes)?;
        Ok(CompositeGraph {
            nodes: self.nodes,
            order,
        })
    }
}

fn topological_order(nodes: &[GraphNode]) -> Result<Vec<NodeId>, GraphError> {
    let n = nodes.len();
    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (target, node) in nodes.iter().enumerate() {
        for binding in &node.bindings {
            in_degree[target] += 1;
            dependents[binding.source.0].push(target);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
        .filter(|&i| in_degree[i] == 0)
        .map(Reverse)
        .collect();
    let mut order = Vec::with_capacity(n);

    while let Some(Reverse(i)) = ready.pop() {
        order.push(NodeId(i));
        for &dependent in &dependents[i] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if order.len() != n {
        let stuck = (0..n).find(|&i| in_degree[i] > 0).unwrap_or(0);
        return Err(GraphError::Cycle(nodes[stuck].node.name().to_string()));
    }
    Ok(order)
}

/// A validated graph with a fixed execution order.
pub struct CompositeGraph {
    nodes: Vec<GraphNode>,
    order: Vec<NodeId>,
}

impl CompositeGraph {
    /// Execution order.
    #[must_use]
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Node names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|id| self.nodes[id.0].node.name()).collect()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True for a graph without nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node handle in declaration order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Node by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.node.name() == name)
            .map(NodeId)
    }

    /// Node behind a handle.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &dyn RenderNode {
        self.nodes[id.0].node.as_ref()
    }

    /// Input bindings of a node.
    #[must_use]
    pub fn bindings(&self, id: NodeId) -> &[Binding] {
        &self.nodes[id.0].bindings
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut dyn RenderNode {
        self.nodes[id.0].node.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::graph::node::{FrameInputs, OutputSpec, PassInputs, PassOutputs};
    use wgpu::TextureFormat;

    struct Stub {
        name: &'static str,
        inputs: &'static [PortName],
        resolution: Resolution,
    }

    const OUT: &[OutputSpec] = &[OutputSpec {
        name: "out",
        format: TextureFormat::Rgba16Float,
    }];

    impl RenderNode for Stub {
        fn name(&self) -> &str {
            self.name
        }
        fn inputs(&self) -> &'static [PortName] {
            self.inputs
        }
        fn outputs(&self) -> &'static [OutputSpec] {
            OUT
        }
        fn resolution(&self) -> Resolution {
            self.resolution
        }
        fn execute(
            &mut self,
            _: &FrameInputs<'_>,
            _: &PassInputs<'_>,
            _: &mut PassOutputs,
        ) -> RenderResult<()> {
            Ok(())
        }
    }

    fn source(name: &'static str) -> Stub {
        Stub {
            name,
            inputs: &[],
            resolution: Resolution::FULL,
        }
    }

    fn unary(name: &'static str) -> Stub {
        Stub {
            name,
            inputs: &["in"],
            resolution: Resolution::Inherit,
        }
    }

    fn binary(name: &'static str) -> Stub {
        Stub {
            name,
            inputs: &["a", "b"],
            resolution: Resolution::Inherit,
        }
    }

    fn graph_error(result: RenderResult<CompositeGraph>) -> GraphError {
        match result {
            Err(RenderError::Graph(e)) => e,
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("graph should not build"),
        }
    }

    #[test]
    fn test_order_respects_dependencies() {
        let mut b = GraphBuilder::new();
        // Declared out of dependency order on purpose.
        let sink = b.add(binary("sink")).unwrap();
        let left = b.add(unary("left")).unwrap();
        let root = b.add(source("root")).unwrap();
        let right = b.add(unary("right")).unwrap();
        b.bind(left, "in", root, "out").unwrap();
        b.bind(right, "in", root, "out").unwrap();
        b.bind(sink, "a", left, "out").unwrap();
        b.bind(sink, "b", right, "out").unwrap();

        let g = b.build().unwrap();
        assert_eq!(g.names(), vec!["root", "left", "right", "sink"]);
        assert_eq!(g.find("right"), Some(right));
        assert_eq!(g.bindings(sink).len(), 2);
    }

    #[test]
    fn test_ties_follow_declaration_order() {
        let mut b = GraphBuilder::new();
        b.add(source("c")).unwrap();
        b.add(source("a")).unwrap();
        b.add(source("b")).unwrap();
        assert_eq!(b.build().unwrap().names(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut b = GraphBuilder::new();
        let x = b.add(unary("x")).unwrap();
        let y = b.add(unary("y")).unwrap();
        b.bind(x, "in", y, "out").unwrap();
        b.bind(y, "in", x, "out").unwrap();
        assert_eq!(graph_error(b.build()), GraphError::Cycle("x".into()));
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut b = GraphBuilder::new();
        let x = b.add(unary("x")).unwrap();
        b.bind(x, "in", x, "out").unwrap();
        assert!(matches!(graph_error(b.build()), GraphError::Cycle(_)));
    }

    #[test]
    fn test_unbound_input_rejected() {
        let mut b = GraphBuilder::new();
        let root = b.add(source("root")).unwrap();
        let sink = b.add(binary("sink")).unwrap();
        b.bind(sink, "a", root, "out").unwrap();
        assert_eq!(
            graph_error(b.build()),
            GraphError::Unbound {
                node: "sink".into(),
                port: "b".into()
            }
        );
    }

    #[test]
    fn test_binding_validation() {
        let mut b = GraphBuilder::new();
        let root = b.add(source("root")).unwrap();
        let sink = b.add(unary("sink")).unwrap();

        assert!(b.add(source("root")).is_err());
        assert!(b.bind(sink, "nope", root, "out").is_err());
        assert!(b.bind(sink, "in", root, "nope").is_err());
        assert!(b.bind(sink, "in", NodeId(9), "out").is_err());
        b.bind(sink, "in", root, "out").unwrap();
        assert!(matches!(
            b.bind(sink, "in", root, "out"),
            Err(RenderError::Graph(GraphError::AlreadyBound { .. }))
        ));
    }

    #[test]
    fn test_inherit_without_inputs_rejected() {
        let mut b = GraphBuilder::new();
        b.add(Stub {
            name: "orphan",
            inputs: &[],
            resolution: Resolution::Inherit,
        })
        .unwrap();
        assert_eq!(
            graph_error(b.build()),
            GraphError::NoResolutionSource("orphan".into())
        );
    }
}
