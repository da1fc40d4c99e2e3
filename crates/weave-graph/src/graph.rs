//! Trees of nodes and the connections between their sockets.
//!
//! Each tree is a `petgraph::StableDiGraph` whose nodes are [`Node`]s and whose
//! edges are [`Link`]s from an output socket to an input socket. Stable
//! indices keep every [`NodeId`] valid across unrelated removals.

use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use tracing::trace;
use weave_core::{NodeId, SocketDirection, SocketRef, TreeId, Value};
use weave_registry::Declaration;

use crate::error::GraphError;
use crate::node::{Interface, Node, NodeKind};

/// Edge weight: which output feeds which input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub output: usize,
    pub input: usize,
}

/// One tree of nodes with its group interface.
#[derive(Debug, Clone)]
pub struct NodeTree {
    pub name: String,
    graph: StableDiGraph<Node, Link>,
    interface: Interface,
    group_input: NodeIndex,
    group_output: NodeIndex,
}

impl NodeTree {
    fn new(name: String, interface: Interface) -> Self {
        let mut graph = StableDiGraph::new();
        let group_input =
            graph.add_node(Node::new(NodeKind::GroupInput).with_outputs(interface.input_names()));
        let group_output =
            graph.add_node(Node::new(NodeKind::GroupOutput).with_inputs(interface.output_names()));
        Self {
            name,
            graph,
            interface,
            group_input,
            group_output,
        }
    }

    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn incoming(&self, node: NodeIndex, input: usize) -> Option<EdgeIndex> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .find(|e| e.weight().input == input)
            .map(|e| e.id())
    }

    /// Drop links whose endpoints no longer have the socket they name.
    fn prune_links(&mut self) {
        let stale: Vec<EdgeIndex> = self
            .graph
            .edge_references()
            .filter(|e| {
                let from = &self.graph[e.source()];
                let to = &self.graph[e.target()];
                e.weight().output >= from.outputs.len() || e.weight().input >= to.inputs.len()
            })
            .map(|e| e.id())
            .collect();
        for edge in stale {
            self.graph.remove_edge(edge);
        }
    }
}

/// A set of node trees. Tree 0 is the root.
///
/// ```
/// use weave_core::TreeId;
/// use weave_graph::{NodeGraph, Interface, InterfaceSocket};
/// use weave_registry::Declaration;
///
/// let mut graph = NodeGraph::new();
/// graph.set_interface(TreeId::ROOT, Interface::new().output(InterfaceSocket::new("result"))).unwrap();
/// let zero = graph
///     .add_operation(TreeId::ROOT, &Declaration::new("zero").output("value"))
///     .unwrap();
/// let out = graph.group_output(TreeId::ROOT).unwrap();
/// graph.connect(zero.output(0), out.input(0)).unwrap();
/// assert_eq!(graph.input_connection(out.input(0)), Some(zero.output(0)));
/// ```
#[derive(Debug, Clone)]
pub struct NodeGraph {
    trees: Vec<NodeTree>,
}

impl Default for NodeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeGraph {
    /// A graph holding an empty root tree.
    pub fn new() -> Self {
        Self {
            trees: vec![NodeTree::new("root".to_string(), Interface::new())],
        }
    }

    /// A full value copy, safe to hand to another thread.
    pub fn snapshot(&self) -> NodeGraph {
        self.clone()
    }

    // ========================================================================
    // Trees
    // ========================================================================

    pub fn add_tree(&mut self, name: impl Into<String>, interface: Interface) -> TreeId {
        let id = TreeId::new(self.trees.len() as u32);
        self.trees.push(NodeTree::new(name.into(), interface));
        trace!(tree = %id, "add tree");
        id
    }

    pub fn tree(&self, tree: TreeId) -> Option<&NodeTree> {
        self.trees.get(tree.index() as usize)
    }

    fn tree_mut(&mut self, tree: TreeId) -> Result<&mut NodeTree, GraphError> {
        self.trees
            .get_mut(tree.index() as usize)
            .ok_or(GraphError::UnknownTree(tree))
    }

    pub fn tree_ids(&self) -> impl Iterator<Item = TreeId> {
        (0..self.trees.len() as u32).map(TreeId::new)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn interface(&self, tree: TreeId) -> Option<&Interface> {
        self.tree(tree).map(NodeTree::interface)
    }

    /// Replace a tree's interface.
    ///
    /// The tree's boundary nodes and every group node instancing it take the
    /// new sockets; links to sockets that disappeared are dropped.
    pub fn set_interface(&mut self, tree: TreeId, interface: Interface) -> Result<(), GraphError> {
        let inputs = interface.input_names();
        let outputs = interface.output_names();
        {
            let t = self.tree_mut(tree)?;
            let (gi, go) = (t.group_input, t.group_output);
            t.graph[gi].outputs = inputs.clone();
            t.graph[go].inputs = outputs.clone();
            t.interface = interface;
        }
        for t in &mut self.trees {
            let instances: Vec<NodeIndex> = t
                .graph
                .node_indices()
                .filter(|&ix| t.graph[ix].kind == NodeKind::Group(tree))
                .collect();
            for ix in instances {
                t.graph[ix].inputs = inputs.clone();
                t.graph[ix].outputs = outputs.clone();
            }
            t.prune_links();
        }
        Ok(())
    }

    pub fn group_input(&self, tree: TreeId) -> Option<NodeId> {
        self.tree(tree).map(|t| node_id(tree, t.group_input))
    }

    pub fn group_output(&self, tree: TreeId) -> Option<NodeId> {
        self.tree(tree).map(|t| node_id(tree, t.group_output))
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Insert a node. Group nodes take their sockets from the instanced tree.
    pub fn add_node(&mut self, tree: TreeId, mut node: Node) -> Result<NodeId, GraphError> {
        if let NodeKind::Group(inner) = node.kind {
            if inner == tree {
                return Err(GraphError::RecursiveGroup(tree));
            }
            let interface = self.interface(inner).ok_or(GraphError::UnknownTree(inner))?;
            node.inputs = interface.input_names();
            node.outputs = interface.output_names();
        }
        let t = self.tree_mut(tree)?;
        let ix = t.graph.add_node(node);
        let id = node_id(tree, ix);
        trace!(node = %id, "add node");
        Ok(id)
    }

    pub fn add_operation(&mut self, tree: TreeId, declaration: &Declaration) -> Result<NodeId, GraphError> {
        self.add_node(tree, Node::operation(declaration))
    }

    pub fn add_group(&mut self, tree: TreeId, inner: TreeId) -> Result<NodeId, GraphError> {
        self.add_node(tree, Node::new(NodeKind::Group(inner)))
    }

    /// Remove a node and every link touching it.
    pub fn remove_node(&mut self, node: NodeId) -> Result<Node, GraphError> {
        let t = self.tree_mut(node.tree)?;
        let ix = node_index(node);
        if ix == t.group_input || ix == t.group_output {
            return Err(GraphError::ProtectedNode(node));
        }
        t.graph.remove_node(ix).ok_or(GraphError::UnknownNode(node))
    }

    pub fn node(&self, node: NodeId) -> Option<&Node> {
        self.tree(node.tree)?.graph.node_weight(node_index(node))
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut Node, GraphError> {
        self.tree_mut(node.tree)?
            .graph
            .node_weight_mut(node_index(node))
            .ok_or(GraphError::UnknownNode(node))
    }

    /// Nodes of `tree` in index order. Empty for an unknown tree.
    pub fn nodes(&self, tree: TreeId) -> impl Iterator<Item = (NodeId, &Node)> {
        self.tree(tree).into_iter().flat_map(move |t| {
            t.graph
                .node_indices()
                .map(move |ix| (node_id(tree, ix), &t.graph[ix]))
        })
    }

    pub fn set_literals(&mut self, node: NodeId, literals: Vec<Value>) -> Result<(), GraphError> {
        self.node_mut(node)?.literals = literals;
        Ok(())
    }

    pub fn set_muted(&mut self, node: NodeId, muted: bool) -> Result<(), GraphError> {
        self.node_mut(node)?.muted = muted;
        Ok(())
    }

    pub fn set_label(&mut self, node: NodeId, label: Option<String>) -> Result<(), GraphError> {
        self.node_mut(node)?.label = label;
        Ok(())
    }

    /// The input a muted node passes through to `output`, if it has one at
    /// the same position.
    pub fn muted_source(&self, output: SocketRef) -> Option<SocketRef> {
        let node = self.node(output.node)?;
        (node.muted && output.index < node.inputs.len()).then(|| output.node.input(output.index))
    }

    // ========================================================================
    // Links
    // ========================================================================

    fn check_socket(&self, socket: SocketRef, direction: SocketDirection) -> Result<(), GraphError> {
        if socket.direction != direction {
            return Err(GraphError::WrongDirection(socket));
        }
        let node = self.node(socket.node).ok_or(GraphError::UnknownNode(socket.node))?;
        let count = match direction {
            SocketDirection::Input => node.inputs.len(),
            SocketDirection::Output => node.outputs.len(),
        };
        if socket.index >= count {
            return Err(GraphError::UnknownSocket(socket));
        }
        Ok(())
    }

    /// Connect an output to an input, replacing the input's previous link.
    ///
    /// Returns the output that used to feed `to`.
    pub fn connect(&mut self, from: SocketRef, to: SocketRef) -> Result<Option<SocketRef>, GraphError> {
        if from.node.tree != to.node.tree {
            return Err(GraphError::CrossTree { from, to });
        }
        self.check_socket(from, SocketDirection::Output)?;
        self.check_socket(to, SocketDirection::Input)?;
        let previous = self.disconnect(to)?;
        let t = self.tree_mut(to.node.tree)?;
        t.graph.add_edge(
            node_index(from.node),
            node_index(to.node),
            Link {
                output: from.index,
                input: to.index,
            },
        );
        trace!(%from, %to, "connect");
        Ok(previous)
    }

    /// Remove the link into `input`, returning the output it came from.
    pub fn disconnect(&mut self, input: SocketRef) -> Result<Option<SocketRef>, GraphError> {
        self.check_socket(input, SocketDirection::Input)?;
        let t = self.tree_mut(input.node.tree)?;
        let Some(edge) = t.incoming(node_index(input.node), input.index) else {
            return Ok(None);
        };
        let source = t.graph.edge_endpoints(edge).map(|(s, _)| s);
        let link = t.graph.remove_edge(edge);
        Ok(source
            .zip(link)
            .map(|(s, link)| node_id(input.node.tree, s).output(link.output)))
    }

    /// The output feeding `input`, if it is connected.
    pub fn input_connection(&self, input: SocketRef) -> Option<SocketRef> {
        let t = self.tree(input.node.tree)?;
        let ix = node_index(input.node);
        t.graph.node_weight(ix)?;
        t.graph
            .edges_directed(ix, Direction::Incoming)
            .find(|e| e.weight().input == input.index)
            .map(|e| node_id(input.node.tree, e.source()).output(e.weight().output))
    }

    /// Every input fed by `output`, in link order.
    pub fn output_connections(&self, output: SocketRef) -> Vec<SocketRef> {
        let Some(t) = self.tree(output.node.tree) else {
            return Vec::new();
        };
        let ix = node_index(output.node);
        if t.graph.node_weight(ix).is_none() {
            return Vec::new();
        }
        let mut targets: Vec<SocketRef> = t
            .graph
            .edges_directed(ix, Direction::Outgoing)
            .filter(|e| e.weight().output == output.index)
            .map(|e| node_id(output.node.tree, e.target()).input(e.weight().input))
            .collect();
        targets.sort();
        targets
    }
}

fn node_id(tree: TreeId, ix: NodeIndex) -> NodeId {
    NodeId::new(tree, ix.index() as u32)
}

fn node_index(node: NodeId) -> NodeIndex {
    NodeIndex::new(node.index as usize)
}
