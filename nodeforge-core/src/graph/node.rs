//! Graph Nodes
//!
//! This module defines the node types that live in a node graph.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::NodeGraph;

/// Unique identifier for a node.
///
/// IDs are drawn from a process-wide counter, so they are unique across
/// every graph, not only within the graph that owns the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in a graph.
///
/// Only `Input` and `Output` matter to the layout engine; the rest is
/// bookkeeping for the client that builds the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A designated graph input. Used as a fallback layout source when
    /// every node has an incoming link.
    Input,

    /// A designated graph output. Always placed in the rightmost layer.
    Output,

    /// An ordinary computation.
    Operation,

    /// An instance of a reusable subgraph.
    Group,
}

/// A 2-D position in graph space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Location {
    pub x: f32,
    pub y: f32,
}

impl Location {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A node in a graph.
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique identifier for this node.
    id: NodeId,

    /// Human-readable name. Not required to be unique.
    name: String,

    /// What kind of node this is.
    kind: NodeKind,

    /// Current position. Rewritten by the layout engine.
    location: Location,

    /// The template this node instances (group nodes only).
    /// Shared by reference with every other instance.
    group: Option<Arc<NodeGraph>>,
}

impl Node {
    /// Create a new node with the given kind.
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            kind,
            location: Location::default(),
            group: None,
        }
    }

    /// Create a new graph input node.
    pub fn input(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Input)
    }

    /// Create a new graph output node.
    pub fn output(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Output)
    }

    /// Create a new operation node.
    pub fn operation(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Operation)
    }

    /// Create a node that instances `template`.
    pub fn group(name: impl Into<String>, template: Arc<NodeGraph>) -> Self {
        Self {
            group: Some(template),
            ..Self::new(name, NodeKind::Group)
        }
    }

    /// Set the initial location.
    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.location = Location::new(x, y);
        self
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the node's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_input(&self) -> bool {
        self.kind == NodeKind::Input
    }

    pub fn is_output(&self) -> bool {
        self.kind == NodeKind::Output
    }

    /// Get the current location.
    pub fn location(&self) -> Location {
        self.location
    }

    /// Move the node.
    pub fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    /// The instanced template, if this is a group node.
    pub fn template(&self) -> Option<&Arc<NodeGraph>> {
        self.group.as_ref()
    }
}
