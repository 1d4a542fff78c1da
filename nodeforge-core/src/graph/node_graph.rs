//! Node Graph
//!
//! A named graph of nodes and directed links. This is the unit the template
//! registry caches and the layout engine positions.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;

use super::node::{Location, Node, NodeId, NodeKind};
use super::GraphError;

/// A directed link: `from`'s output feeds `to`'s input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
}

/// A named node graph.
///
/// Nodes are kept in insertion order, which makes every traversal over the
/// graph (and therefore every layout) deterministic.
#[derive(Clone, Default)]
pub struct NodeGraph {
    name: String,
    nodes: IndexMap<NodeId, Node>,
    links: Vec<Link>,
}

impl fmt::Debug for NodeGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeGraph")
            .field("name", &self.name)
            .field("node_count", &self.nodes.len())
            .field("link_count", &self.links.len())
            .finish()
    }
}

impl NodeGraph {
    /// Create a new empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            links: Vec::new(),
        }
    }

    /// The graph's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a node to the graph.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    pub fn add_input(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(Node::input(name))
    }

    pub fn add_output(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(Node::output(name))
    }

    pub fn add_operation(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(Node::operation(name))
    }

    /// Add a node instancing `template`.
    pub fn add_group(&mut self, name: impl Into<String>, template: Arc<NodeGraph>) -> NodeId {
        self.add_node(Node::group(name, template))
    }

    /// Add a link: `from` feeds `to`.
    ///
    /// Both endpoints must already be part of this graph.
    pub fn link(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        for id in [from, to] {
            if !self.nodes.contains_key(&id) {
                return Err(GraphError::UnknownNode {
                    graph: self.name.clone(),
                    node: id,
                });
            }
        }
        self.links.push(Link { from, to });
        Ok(())
    }

    /// Remove a node and every link touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.shift_remove(&id)?;
        self.links.retain(|link| link.from != id && link.to != id);
        Some(node)
    }

    /// Remove one link between `from` and `to`. Returns whether one existed.
    pub fn remove_link(&mut self, from: NodeId, to: NodeId) -> bool {
        match self
            .links
            .iter()
            .position(|link| link.from == from && link.to == to)
        {
            Some(index) => {
                self.links.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Get a reference to a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a mutable reference to a node.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Iterate over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All links in insertion order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Find a node by name (first match).
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|node| node.name() == name)
            .map(Node::id)
    }

    /// Nodes with a link into `id`.
    pub fn predecessors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.links
            .iter()
            .filter(move |link| link.to == id)
            .map(|link| link.from)
    }

    /// Nodes `id` links into.
    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.links
            .iter()
            .filter(move |link| link.from == id)
            .map(|link| link.to)
    }

    /// Current location of a node.
    pub fn location(&self, id: NodeId) -> Option<Location> {
        self.nodes.get(&id).map(Node::location)
    }

    /// The distinct templates instanced by this graph's group nodes.
    pub fn groups(&self) -> Vec<Arc<NodeGraph>> {
        let mut seen = HashSet::new();
        self.nodes
            .values()
            .filter_map(Node::template)
            .filter(|template| seen.insert(Arc::as_ptr(template)))
            .cloned()
            .collect()
    }

    /// Structural hash of the graph's content.
    ///
    /// Covers the graph name, node names and kinds in order, the names of
    /// instanced templates and the links (by node position). Node IDs and
    /// locations are excluded, so two builds of the same recipe agree.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.name.hash(&mut hasher);
        self.nodes.len().hash(&mut hasher);
        for node in self.nodes.values() {
            node.name().hash(&mut hasher);
            node.kind().hash(&mut hasher);
            if node.kind() == NodeKind::Group {
                node.template().map(|t| t.name()).hash(&mut hasher);
            }
        }
        self.links.len().hash(&mut hasher);
        for link in &self.links {
            self.nodes.get_index_of(&link.from).hash(&mut hasher);
            self.nodes.get_index_of(&link.to).hash(&mut hasher);
        }
        hasher.finish()
    }
}
