//! Node Graph Model
//!
//! This module implements the in-memory graph that templates are built from
//! and that the layout engine positions.
//!
//! # Overview
//!
//! A graph is a directed graph where:
//!
//! - Nodes are opaque units of computation with a name, a kind and a position
//! - Links represent data flow: if A feeds B, there is a link from A to B
//!
//! Graphs are not required to be acyclic. Group nodes instance other graphs
//! by reference (`Arc`), so a template built once can be reused by any
//! number of parents without being copied.

mod node;
mod node_graph;

use thiserror::Error;

pub use node::{Location, Node, NodeId, NodeKind};
pub use node_graph::{Link, NodeGraph};

/// Errors raised while assembling a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A link endpoint does not belong to the graph.
    #[error("node {node} is not part of graph `{graph}`")]
    UnknownNode { graph: String, node: NodeId },
}
