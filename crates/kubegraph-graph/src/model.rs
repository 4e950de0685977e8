//! The in-memory directed labeled multigraph (spec §3 `Graph`).
//!
//! Grounded on spec §9's design note: "use parallel index arrays, not
//! pointer cycles" — edges live in a flat `Vec`, nodes are keyed by their
//! synthetic id in an `IndexMap` (insertion-ordered, so BFS level order and
//! topological output are deterministic for a fixed input), and forward /
//! reverse adjacency are `id -> Vec<edge index>` maps kept in lockstep by
//! the builder (`builder.rs`) rather than derived lazily.

use indexmap::IndexMap;
use kubegraph_model::{ResourceEdge, ResourceNode, Uid};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;

/// Snapshot counts derived from the graph's current contents (§3 I2). Never
/// stored on `Graph` itself — deriving them fresh means I2 holds by
/// construction instead of by careful bookkeeping.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub platform_nodes: usize,
}

/// `G = (V, E)` plus the adjacency structures the traverser and path
/// tracker need. The only way to mutate a `Graph` is through
/// [`crate::builder::GraphBuilder`]; this type exposes read-only queries.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub(crate) nodes: IndexMap<String, ResourceNode>,
    pub(crate) edges: Vec<ResourceEdge>,
    /// node id -> indices into `edges` where that node is the source.
    pub(crate) adjacency: HashMap<String, Vec<usize>>,
    /// node id -> indices into `edges` where that node is the target.
    pub(crate) reverse_adjacency: HashMap<String, Vec<usize>>,
    /// UID -> node id, used by the builder to detect aliasing (§3
    /// "secondary UID index").
    pub(crate) uid_index: HashMap<Uid, String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&ResourceNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &String> {
        self.nodes.keys()
    }

    pub fn edges(&self) -> &[ResourceEdge] {
        &self.edges
    }

    pub fn edge(&self, id: &str) -> Option<&ResourceEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn outgoing(&self, node_id: &str) -> impl Iterator<Item = &ResourceEdge> {
        self.adjacency
            .get(node_id)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.edges[idx])
    }

    pub fn incoming(&self, node_id: &str) -> impl Iterator<Item = &ResourceEdge> {
        self.reverse_adjacency
            .get(node_id)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.edges[idx])
    }

    pub fn node_by_uid(&self, uid: &Uid) -> Option<&ResourceNode> {
        self.uid_index.get(uid).and_then(|id| self.nodes.get(id))
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            platform_nodes: self.nodes.values().filter(|n| n.platform).count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Serializes as `{nodes, edges, stats}` rather than the internal adjacency
/// representation, so an outer collaborator (e.g. the CLI) can emit a
/// traversal's graph as JSON without caring how edges are indexed.
impl Serialize for Graph {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Graph", 3)?;
        state.serialize_field("nodes", &self.nodes.values().collect::<Vec<_>>())?;
        state.serialize_field("edges", &self.edges)?;
        state.serialize_field("stats", &self.stats())?;
        state.end()
    }
}
