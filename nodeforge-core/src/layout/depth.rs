//! Depth Assignment
//!
//! Assigns every node a layer index by breadth-first propagation from the
//! graph's sources.
//!
//! # Algorithm
//!
//! 1. Build `depends_on` and `feeds_into` adjacency from the link list
//! 2. Sources are nodes without incoming links; if there are none, fall back
//!    to the input-tagged nodes
//! 3. BFS from all sources at depth 0. A node is expanded only on its first
//!    visit; a later visit raises its recorded depth to the larger value but
//!    does not push the increase on to its successors
//! 4. Unreached nodes get depth 0
//! 5. Output-tagged nodes are forced one layer past the deepest non-output
//!
//! Because of step 3, a node reached late through a long path can end up
//! deeper than one of its successors. `DepthMap::non_monotonic_links`
//! reports those links.

use std::collections::{HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{trace, warn};

use super::{LayoutError, LayoutGraph};

type Neighbors<Id> = SmallVec<[Id; 4]>;

/// Adjacency in both directions, keyed in node order.
pub(crate) struct Adjacency<Id> {
    depends_on: IndexMap<Id, Neighbors<Id>>,
    feeds_into: IndexMap<Id, Neighbors<Id>>,
}

impl<Id: Copy + Eq + Hash + Debug> Adjacency<Id> {
    /// Build adjacency from a graph, rejecting links to unknown nodes.
    pub(crate) fn build<G>(graph: &G) -> Result<Self, LayoutError>
    where
        G: LayoutGraph<Id = Id>,
    {
        let mut depends_on: IndexMap<Id, Neighbors<Id>> =
            graph.node_ids().map(|id| (id, SmallVec::new())).collect();
        let mut feeds_into: IndexMap<Id, Neighbors<Id>> =
            depends_on.keys().map(|&id| (id, SmallVec::new())).collect();

        for (from, to) in graph.links() {
            if !depends_on.contains_key(&from) || !depends_on.contains_key(&to) {
                return Err(LayoutError::DanglingLink {
                    from: format!("{from:?}"),
                    to: format!("{to:?}"),
                });
            }
            if let Some(preds) = depends_on.get_mut(&to) {
                if !preds.contains(&from) {
                    preds.push(from);
                }
            }
            if let Some(succs) = feeds_into.get_mut(&from) {
                if !succs.contains(&to) {
                    succs.push(to);
                }
            }
        }

        Ok(Self {
            depends_on,
            feeds_into,
        })
    }

    /// Node IDs in graph order.
    pub(crate) fn nodes(&self) -> impl Iterator<Item = Id> + '_ {
        self.depends_on.keys().copied()
    }

    /// Direct predecessors of `id`.
    pub(crate) fn predecessors(&self, id: Id) -> &[Id] {
        self.depends_on
            .get(&id)
            .map(|preds| preds.as_slice())
            .unwrap_or_default()
    }

    /// Direct successors of `id`.
    pub(crate) fn successors(&self, id: Id) -> &[Id] {
        self.feeds_into
            .get(&id)
            .map(|succs| succs.as_slice())
            .unwrap_or_default()
    }
}

/// Layer index of every node, in graph order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthMap<Id: Hash + Eq> {
    depths: IndexMap<Id, usize>,
}

impl<Id: Copy + Eq + Hash> DepthMap<Id> {
    /// Depth of `id`, if it is part of the graph.
    pub fn get(&self, id: Id) -> Option<usize> {
        self.depths.get(&id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id, usize)> + '_ {
        self.depths.iter().map(|(&id, &depth)| (id, depth))
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    /// Deepest layer, or 0 for an empty map.
    pub fn max_depth(&self) -> usize {
        self.depths.values().copied().max().unwrap_or(0)
    }

    /// Nodes grouped by depth, `0..=max_depth`, each layer in graph order.
    ///
    /// Layers may be empty when forcing outputs skips a depth.
    pub fn layers(&self) -> Vec<Vec<Id>> {
        if self.depths.is_empty() {
            return Vec::new();
        }
        let mut layers = vec![Vec::new(); self.max_depth() + 1];
        for (&id, &depth) in &self.depths {
            layers[depth].push(id);
        }
        layers
    }

    /// Links `(u, v)` where `v` sits in a shallower layer than `u`.
    pub fn non_monotonic_links<I>(&self, links: I) -> Vec<(Id, Id)>
    where
        I: IntoIterator<Item = (Id, Id)>,
    {
        links
            .into_iter()
            .filter(|(from, to)| match (self.get(*from), self.get(*to)) {
                (Some(from_depth), Some(to_depth)) => to_depth < from_depth,
                _ => false,
            })
            .collect()
    }
}

impl<Id: Copy + Eq + Hash> IntoIterator for DepthMap<Id> {
    type Item = (Id, usize);
    type IntoIter = indexmap::map::IntoIter<Id, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.depths.into_iter()
    }
}

/// Compute the depth of every node without moving anything.
pub fn node_depths<G: LayoutGraph>(graph: &G) -> Result<DepthMap<G::Id>, LayoutError> {
    let adjacency = Adjacency::build(graph)?;
    Ok(assign_depths(graph, &adjacency))
}

/// Run steps 1-6 over prebuilt adjacency.
pub(crate) fn assign_depths<G: LayoutGraph>(
    graph: &G,
    adjacency: &Adjacency<G::Id>,
) -> DepthMap<G::Id> {
    let mut sources: Vec<G::Id> = adjacency
        .nodes()
        .filter(|&id| adjacency.predecessors(id).is_empty())
        .collect();
    if sources.is_empty() {
        sources = adjacency.nodes().filter(|&id| graph.is_input(id)).collect();
        if adjacency.nodes().next().is_some() {
            warn!(
                inputs = sources.len(),
                "every node has an incoming link; using input nodes as layout sources"
            );
        }
    }

    let mut reached: IndexMap<G::Id, usize> = IndexMap::new();
    let mut visited = HashSet::new();
    let mut queue: VecDeque<(G::Id, usize)> =
        sources.into_iter().map(|id| (id, 0)).collect();

    while let Some((id, depth)) = queue.pop_front() {
        if !visited.insert(id) {
            if let Some(recorded) = reached.get_mut(&id) {
                *recorded = (*recorded).max(depth);
            }
            continue;
        }
        trace!(node = ?id, depth, "depth assigned");
        reached.insert(id, depth);
        for &next in adjacency.successors(id) {
            queue.push_back((next, depth + 1));
        }
    }

    let mut depths: IndexMap<G::Id, usize> = adjacency
        .nodes()
        .map(|id| (id, reached.get(&id).copied().unwrap_or(0)))
        .collect();

    let deepest_non_output = depths
        .iter()
        .filter(|&(&id, _)| !graph.is_output(id))
        .map(|(_, &depth)| depth)
        .max();
    let output_depth = deepest_non_output.map_or(0, |depth| depth + 1);
    for (&id, depth) in depths.iter_mut() {
        if graph.is_output(id) {
            *depth = output_depth;
        }
    }

    DepthMap { depths }
}
