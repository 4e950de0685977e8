//! Graph mutation (spec §4.D "Builder"). `Graph` itself is read-only from
//! the outside; every insertion, upsert, or merge goes through a
//! `GraphBuilder` so forward/reverse adjacency and degree counters never
//! drift out of lockstep (§3 I1).

use crate::model::Graph;
use kubegraph_model::{ResourceEdge, ResourceNode, SkippedReference};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self { graph: Graph::new() }
    }

    pub fn from_graph(graph: Graph) -> Self {
        Self { graph }
    }

    pub fn build(self) -> Graph {
        self.graph
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Upserts a node by its identity tuple (§4.D "`AddNode` upserts by
    /// identity; on upsert, if the new discovery path is strictly shorter
    /// it replaces the old one"). Also resolves UID aliasing (§3 "a
    /// secondary UID index detects aliasing when the same UID appears
    /// under two synthetic identities (merge favors the shorter discovery
    /// path)"). Returns the node's final (canonical) id.
    pub fn add_node(&mut self, mut node: ResourceNode) -> String {
        let identity_id = node.resource.node_id();
        node.id = identity_id.clone();

        if let Some(uid) = node.uid.clone() {
            if let Some(existing_id) = self.graph.uid_index.get(&uid).cloned() {
                if existing_id != identity_id {
                    return self.merge_alias(existing_id, node);
                }
            }
        }

        match self.graph.nodes.get(&identity_id) {
            Some(existing) if node.discovery_path.len() < existing.discovery_path.len() => {
                let mut merged = existing.clone();
                merged.discovery_depth = node.discovery_depth;
                merged.discovery_path = node.discovery_path;
                self.graph.nodes.insert(identity_id.clone(), merged);
            }
            Some(_) => {}
            None => {
                if let Some(uid) = &node.uid {
                    self.graph.uid_index.insert(uid.clone(), identity_id.clone());
                }
                self.graph.nodes.insert(identity_id.clone(), node);
            }
        }
        identity_id
    }

    /// Resolves two synthetic identities that carry the same UID. The
    /// survivor is whichever has the shorter discovery path; the other's
    /// node entry is dropped and every edge referencing it is rewritten to
    /// the survivor's id.
    fn merge_alias(&mut self, existing_id: String, incoming: ResourceNode) -> String {
        let incoming_id = incoming.resource.node_id();
        let existing = self.graph.nodes.get(&existing_id).cloned();

        let (canonical_id, mut canonical_node, alias_id) = match existing {
            Some(existing_node) if incoming.discovery_path.len() < existing_node.discovery_path.len() => {
                (incoming_id.clone(), incoming, existing_id)
            }
            Some(existing_node) => (existing_id.clone(), existing_node, incoming_id),
            None => (incoming_id.clone(), incoming, existing_id),
        };

        if alias_id != canonical_id {
            self.reassign_node_id(&alias_id, &canonical_id);
        }
        canonical_node.id = canonical_id.clone();
        if let Some(uid) = &canonical_node.uid {
            self.graph.uid_index.insert(uid.clone(), canonical_id.clone());
        }
        self.graph.nodes.insert(canonical_id.clone(), canonical_node);
        canonical_id
    }

    fn reassign_node_id(&mut self, old_id: &str, new_id: &str) {
        self.graph.nodes.shift_remove(old_id);
        for edge in self.graph.edges.iter_mut() {
            if edge.source == old_id {
                edge.source = new_id.to_string();
            }
            if edge.target == old_id {
                edge.target = new_id.to_string();
            }
        }
        if let Some(idxs) = self.graph.adjacency.remove(old_id) {
            self.graph.adjacency.entry(new_id.to_string()).or_default().extend(idxs);
        }
        if let Some(idxs) = self.graph.reverse_adjacency.remove(old_id) {
            self.graph.reverse_adjacency.entry(new_id.to_string()).or_default().extend(idxs);
        }
    }

    /// Inserts an edge unless `(source, target, fieldPath)` is already
    /// present (§4.D "`AddEdge` is a no-op if the edge ... already
    /// exists"). Returns whether the edge was newly inserted.
    pub fn add_edge(&mut self, mut edge: ResourceEdge) -> bool {
        let key = edge.dedup_key();
        let is_dup = self
            .graph
            .adjacency
            .get(&edge.source)
            .into_iter()
            .flatten()
            .any(|&idx| self.graph.edges[idx].dedup_key() == key);
        if is_dup {
            return false;
        }

        if edge.id.is_empty() {
            edge.id = format!("edge-{}", self.graph.edges.len());
        }

        let idx = self.graph.edges.len();
        self.graph.edges.push(edge.clone());
        self.graph.adjacency.entry(edge.source.clone()).or_default().push(idx);
        self.graph.reverse_adjacency.entry(edge.target.clone()).or_default().push(idx);

        if let Some(node) = self.graph.nodes.get_mut(&edge.source) {
            node.metadata.outbound_ref_count += 1;
        }
        if let Some(node) = self.graph.nodes.get_mut(&edge.target) {
            node.metadata.inbound_ref_count += 1;
        }
        true
    }

    /// Records a reference the traversal engine decided not to follow on
    /// its source node, for diagnostics (§7 "a `skippedReference` is
    /// recorded on the source node with reason"). A no-op if the source
    /// node isn't in the graph (e.g. a root whose own identity failed
    /// admission before it was ever added).
    pub fn record_skipped_reference(&mut self, node_id: &str, field_path: String, reason: String) {
        if let Some(node) = self.graph.nodes.get_mut(node_id) {
            node.metadata.skipped_references.push(SkippedReference { field_path, reason });
        }
    }

    /// Merges multiple graphs into one (§4.D "`MergeGraphs` deduplicates
    /// nodes by UID first, then by identity tuple; edges are deduplicated
    /// by the same triple under the merged node namespace").
    ///
    /// Per the resolved open question in `DESIGN.md`, every edge — including
    /// ones that sit on a cycle — is remapped onto the merged node ids; the
    /// original implementation's partial remap is not reproduced here.
    pub fn merge_graphs(graphs: Vec<Graph>) -> Graph {
        let mut builder = GraphBuilder::new();
        for graph in graphs {
            let mut remap: HashMap<String, String> = HashMap::new();
            for node in graph.nodes.values() {
                let canonical = builder.add_node(node.clone());
                remap.insert(node.id.clone(), canonical);
            }
            for edge in graph.edges {
                let mut edge = edge;
                if let Some(mapped) = remap.get(&edge.source) {
                    edge.source = mapped.clone();
                }
                if let Some(mapped) = remap.get(&edge.target) {
                    edge.target = mapped.clone();
                }
                builder.add_edge(edge);
            }
        }
        builder.build()
    }
}
