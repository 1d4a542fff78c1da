//! Nodeforge Core
//!
//! This crate provides the engine behind procedural node-graph generators.
//! It implements:
//!
//! - An in-memory node graph with kind-tagged nodes and directed links
//! - A build-once registry for named, reusable subgraphs (templates)
//! - A layered layout engine that positions nodes by dependency depth
//!
//! The crate knows nothing about what a node computes. Generators decide
//! which nodes and links make up a template; the engine caches the result
//! and lays it out.
//!
//! # Architecture
//!
//! The crate is organized into three modules:
//!
//! - `graph`: nodes, links and the `NodeGraph` container
//! - `registry`: the `TemplateRegistry` build cache
//! - `layout`: depth assignment and placement
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use nodeforge_core::graph::NodeGraph;
//! use nodeforge_core::layout::LayoutOptions;
//! use nodeforge_core::registry::{RegistryError, TemplateRegistry};
//!
//! fn build_vector(registry: &TemplateRegistry<NodeGraph>) -> Result<Arc<NodeGraph>, RegistryError> {
//!     type BoxError = Box<dyn std::error::Error + Send + Sync>;
//!
//!     let built = registry.get_or_build("Construct Vector", || -> Result<NodeGraph, BoxError> {
//!         let mut graph = NodeGraph::new("Construct Vector");
//!         let input = graph.add_input("Group Input");
//!         let combine = graph.add_operation("Combine XYZ");
//!         let output = graph.add_output("Group Output");
//!         graph.link(input, combine)?;
//!         graph.link(combine, output)?;
//!         graph.auto_layout(&LayoutOptions::default())?;
//!         Ok(graph)
//!     })?;
//!     Ok(built.template)
//! }
//!
//! let registry = TemplateRegistry::new();
//! let first = build_vector(&registry).unwrap();
//! let second = build_vector(&registry).unwrap();
//! assert!(Arc::ptr_eq(&first, &second));
//! ```

pub mod graph;
pub mod layout;
pub mod registry;

pub use graph::{GraphError, Link, Location, Node, NodeGraph, NodeId, NodeKind};
pub use layout::{auto_layout, node_depths, DepthMap, LayoutError, LayoutGraph, LayoutOptions};
pub use registry::{Built, RegistryError, Template, TemplateRegistry};
