//! Layered Layout
//!
//! This module positions the nodes of a finished graph so data flows left to
//! right by dependency depth.
//!
//! # Overview
//!
//! Layout runs in two phases:
//!
//! 1. Depth assignment (`depth`): breadth-first propagation from the graph's
//!    sources gives every node a layer index. `node_depths` exposes this
//!    phase on its own for diagnostics.
//! 2. Placement (`place`): each layer becomes a column, and nodes inside a
//!    column are ordered by where their predecessors sat.
//!
//! Depths are recomputed from scratch on every call. The engine never fails
//! on cycles, disconnected nodes or missing inputs; it only rejects links
//! that point outside the node set and invalid options.
//!
//! The algorithms work against the `LayoutGraph` trait rather than
//! `NodeGraph` directly, so any graph representation with ids, kind tags,
//! locations and a link list can be laid out.

mod depth;
mod options;
mod place;

use std::fmt::Debug;
use std::hash::Hash;

use thiserror::Error;

use crate::graph::{Location, NodeGraph, NodeId};

pub use depth::{node_depths, DepthMap};
pub use options::LayoutOptions;
pub use place::auto_layout;

/// Errors raised by the layout engine.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A link endpoint is not part of the node set.
    #[error("link {from} -> {to} references a node outside the graph")]
    DanglingLink { from: String, to: String },

    /// Spacing or origin values that cannot produce a layout.
    #[error("invalid layout options: {0}")]
    InvalidOptions(String),

    /// Options document could not be parsed.
    #[error("could not parse layout options: {0}")]
    Config(#[from] serde_json::Error),
}

/// What the layout engine needs from a graph.
pub trait LayoutGraph {
    /// Stable node identity.
    type Id: Copy + Eq + Hash + Debug;

    /// Every node, in a stable order.
    fn node_ids(&self) -> impl Iterator<Item = Self::Id> + '_;

    /// Every link as `(from, to)`.
    fn links(&self) -> impl Iterator<Item = (Self::Id, Self::Id)> + '_;

    /// Is this a designated graph input?
    fn is_input(&self, id: Self::Id) -> bool;

    /// Is this a designated graph output?
    fn is_output(&self, id: Self::Id) -> bool;

    fn location(&self, id: Self::Id) -> Location;

    fn set_location(&mut self, id: Self::Id, location: Location);
}

impl LayoutGraph for NodeGraph {
    type Id = NodeId;

    fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes().map(|node| node.id())
    }

    fn links(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        NodeGraph::links(self)
            .iter()
            .map(|link| (link.from, link.to))
    }

    fn is_input(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| node.is_input())
    }

    fn is_output(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| node.is_output())
    }

    fn location(&self, id: NodeId) -> Location {
        NodeGraph::location(self, id).unwrap_or_default()
    }

    fn set_location(&mut self, id: NodeId, location: Location) {
        if let Some(node) = self.node_mut(id) {
            node.set_location(location);
        }
    }
}

impl NodeGraph {
    /// Lay out this graph in place.
    pub fn auto_layout(&mut self, options: &LayoutOptions) -> Result<(), LayoutError> {
        auto_layout(self, options)
    }

    /// Depth of every node, without moving anything.
    pub fn depths(&self) -> Result<DepthMap<NodeId>, LayoutError> {
        node_depths(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal stand-in for a host graph: string ids, explicit tags.
    #[derive(Default)]
    struct HostGraph {
        nodes: Vec<(&'static str, Location)>,
        links: Vec<(&'static str, &'static str)>,
        inputs: Vec<&'static str>,
        outputs: Vec<&'static str>,
    }

    impl LayoutGraph for HostGraph {
        type Id = &'static str;

        fn node_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
            self.nodes.iter().map(|(name, _)| *name)
        }

        fn links(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
            self.links.iter().copied()
        }

        fn is_input(&self, id: &'static str) -> bool {
            self.inputs.contains(&id)
        }

        fn is_output(&self, id: &'static str) -> bool {
            self.outputs.contains(&id)
        }

        fn location(&self, id: &'static str) -> Location {
            self.nodes
                .iter()
                .find(|(name, _)| *name == id)
                .map(|(_, location)| *location)
                .unwrap_or_default()
        }

        fn set_location(&mut self, id: &'static str, location: Location) {
            if let Some(entry) = self.nodes.iter_mut().find(|(name, _)| *name == id) {
                entry.1 = location;
            }
        }
    }

    #[test]
    fn lays_out_foreign_graph_types() {
        let mut graph = HostGraph {
            nodes: vec![("in", Location::default()), ("out", Location::default())],
            links: vec![("in", "out")],
            inputs: vec!["in"],
            outputs: vec!["out"],
        };

        auto_layout(&mut graph, &LayoutOptions::default().with_start(0.0, 0.0)).unwrap();

        assert_eq!(graph.location("in"), Location::new(0.0, 0.0));
        assert_eq!(graph.location("out"), Location::new(250.0, 0.0));
    }

    #[test]
    fn dangling_link_is_a_contract_violation() {
        let mut graph = HostGraph {
            nodes: vec![("a", Location::default())],
            links: vec![("a", "ghost")],
            ..HostGraph::default()
        };

        let err = node_depths(&graph).unwrap_err();
        assert!(matches!(
            &err,
            LayoutError::DanglingLink { from, to } if from == "\"a\"" && to == "\"ghost\""
        ));
        assert!(auto_layout(&mut graph, &LayoutOptions::default()).is_err());
    }

    #[test]
    fn input_and_output_tags_on_one_node() {
        // 0 -> 1 -> 2 -> 0 has no source, so the fallback starts from "0"
        // because it is tagged input. Being tagged output too, it is then
        // forced one layer past the deepest other node.
        let graph = HostGraph {
            nodes: vec![
                ("0", Location::default()),
                ("1", Location::default()),
                ("2", Location::default()),
            ],
            links: vec![("0", "1"), ("1", "2"), ("2", "0")],
            inputs: vec!["0"],
            outputs: vec!["0"],
        };

        let depths: Vec<_> = node_depths(&graph).unwrap().into_iter().collect();
        assert_eq!(depths, vec![("0", 3), ("1", 1), ("2", 2)]);
    }

    #[test]
    fn node_graph_convenience_methods() {
        let mut graph = NodeGraph::new("demo");
        let a = graph.add_input("a");
        let b = graph.add_output("b");
        graph.link(a, b).unwrap();

        assert_eq!(graph.depths().unwrap().get(b), Some(1));
        graph.auto_layout(&LayoutOptions::default()).unwrap();
        assert_eq!(graph.location(b).unwrap().x, -1150.0);
    }
}
