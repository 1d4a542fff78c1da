//! Layer Placement
//!
//! Turns a depth map into coordinates: one column per depth, each column
//! centered vertically on `start_y`.

use std::collections::HashMap;

use tracing::debug_span;

use super::depth::{assign_depths, Adjacency};
use super::{LayoutError, LayoutGraph, LayoutOptions};
use crate::graph::Location;

/// Position every node of `graph` by dependency depth.
///
/// Within a column, nodes are ordered by the mean y of their direct
/// predecessors (highest first), read from the locations the graph had when
/// this call started. Once predecessor positions stop changing, calling
/// this again reproduces the same coordinates.
///
/// A graph with no nodes is left alone without looking at `options`.
pub fn auto_layout<G: LayoutGraph>(
    graph: &mut G,
    options: &LayoutOptions,
) -> Result<(), LayoutError> {
    if graph.node_ids().next().is_none() {
        return Ok(());
    }
    options.validate()?;
    let adjacency = Adjacency::build(graph)?;
    let depths = assign_depths(graph, &adjacency);
    let _span = debug_span!(
        "auto_layout",
        nodes = depths.len(),
        layers = depths.max_depth() + 1
    )
    .entered();

    let snapshot: HashMap<G::Id, Location> = adjacency
        .nodes()
        .map(|id| (id, graph.location(id)))
        .collect();
    let mean_predecessor_y = |id: G::Id| -> f32 {
        let preds = adjacency.predecessors(id);
        if preds.is_empty() {
            return 0.0;
        }
        let sum: f32 = preds
            .iter()
            .filter_map(|pred| snapshot.get(pred))
            .map(|location| location.y)
            .sum();
        sum / preds.len() as f32
    };

    for (depth, layer) in depths.layers().into_iter().enumerate() {
        if layer.is_empty() {
            continue;
        }
        let mut ordered: Vec<(G::Id, f32)> = layer
            .into_iter()
            .map(|id| (id, mean_predecessor_y(id)))
            .collect();
        // Stable, so ties keep graph order.
        ordered.sort_by(|a, b| b.1.total_cmp(&a.1));

        let x = options.start_x + depth as f32 * options.x_spacing;
        let total_height = (ordered.len() - 1) as f32 * options.y_spacing;
        let top = options.start_y + total_height / 2.0;
        for (row, (id, _)) in ordered.into_iter().enumerate() {
            graph.set_location(id, Location::new(x, top - row as f32 * options.y_spacing));
        }
    }

    Ok(())
}
