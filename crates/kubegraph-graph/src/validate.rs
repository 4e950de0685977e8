//! `ValidateGraph` (spec §4.D): checks invariants I1-I6 plus degree-counter
//! consistency and returns a structured report. Promoted to a first-class
//! serializable type per `SPEC_FULL.md` §2 ("`ValidationResult` as a
//! first-class, serializable report") so the CLI can print it, matching the
//! teacher's `Diagnostics`/`DiagnosticItem`/`Severity` shape.

use crate::model::Graph;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, code: &str, message: String) {
        self.errors.push(ValidationIssue {
            severity: Severity::Error,
            code: code.to_string(),
            message,
        });
    }

    fn warn(&mut self, code: &str, message: String) {
        self.warnings.push(ValidationIssue {
            severity: Severity::Warning,
            code: code.to_string(),
            message,
        });
    }
}

/// Runs every check in spec §3's invariant list against `graph`.
pub fn validate_graph(graph: &Graph) -> ValidationResult {
    let mut result = ValidationResult::default();

    // I1: every adjacency entry has a matching edge; symmetric in reverse.
    for (node_id, idxs) in &graph.adjacency {
        for &idx in idxs {
            let edge = &graph.edges[idx];
            if &edge.source != node_id {
                result.error(
                    "I1",
                    format!("adjacency[{node_id}] references edge {} whose source is {}", edge.id, edge.source),
                );
            }
        }
    }
    for (node_id, idxs) in &graph.reverse_adjacency {
        for &idx in idxs {
            let edge = &graph.edges[idx];
            if &edge.target != node_id {
                result.error(
                    "I1",
                    format!("reverse_adjacency[{node_id}] references edge {} whose target is {}", edge.id, edge.target),
                );
            }
        }
    }

    // P2/I4: edge endpoints exist; identity tuples are unique (guaranteed by
    // IndexMap keying, checked here for completeness).
    for edge in &graph.edges {
        if !graph.nodes.contains_key(&edge.source) {
            result.error("P2", format!("edge {} has missing source node {}", edge.id, edge.source));
        }
        if !graph.nodes.contains_key(&edge.target) {
            result.error("P2", format!("edge {} has missing target node {}", edge.id, edge.target));
        }
        if !(0.0..=1.0).contains(&edge.confidence) {
            result.error("I6", format!("edge {} has out-of-range confidence {}", edge.id, edge.confidence));
        }
    }

    // P4: no two edges share (source, target, fieldPath).
    let mut seen = std::collections::HashSet::new();
    for edge in &graph.edges {
        if !seen.insert(edge.dedup_key()) {
            result.error("P4", format!("duplicate edge triple for {}/{}/{}", edge.source, edge.target, edge.field_path));
        }
    }

    for node in graph.nodes.values() {
        // I3: discoveryDepth >= 0 is implied by the unsigned type; root
        // nodes have depth 0 and an empty path.
        if node.discovery_depth == 0 && !node.discovery_path.is_empty() {
            result.warn("I3", format!("node {} has depth 0 but a non-empty discovery path", node.id));
        }
        // I5: the last path element, if any, is the node itself.
        if let Some(last) = node.discovery_path.last() {
            if last != &node.id {
                result.error("I5", format!("node {}'s discovery path does not end at itself", node.id));
            }
        }

        let outbound = graph.adjacency.get(&node.id).map(Vec::len).unwrap_or(0);
        let inbound = graph.reverse_adjacency.get(&node.id).map(Vec::len).unwrap_or(0);
        if node.metadata.outbound_ref_count != outbound {
            result.warn(
                "counter",
                format!(
                    "node {} outbound_ref_count {} disagrees with adjacency length {}",
                    node.id, node.metadata.outbound_ref_count, outbound
                ),
            );
        }
        if node.metadata.inbound_ref_count != inbound {
            result.warn(
                "counter",
                format!(
                    "node {} inbound_ref_count {} disagrees with reverse adjacency length {}",
                    node.id, node.metadata.inbound_ref_count, inbound
                ),
            );
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use chrono::Utc;
    use kubegraph_model::{DetectionMethod, NodeMetadata, RefType, ResourceEdge, ResourceNode, ResourceRef};

    fn node(name: &str) -> ResourceNode {
        let resource = ResourceRef::new("v1", "Widget", Some("default".into()), name);
        ResourceNode {
            id: resource.node_id(),
            resource,
            uid: None,
            discovered_at: Utc::now(),
            discovery_depth: 0,
            discovery_path: vec![],
            platform: false,
            metadata: NodeMetadata::default(),
        }
    }

    #[test]
    fn freshly_built_graph_is_valid() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(node("a"));
        let b = builder.add_node(node("b"));
        builder.add_edge(ResourceEdge {
            id: String::new(),
            source: a.clone(),
            target: b.clone(),
            relation_type: RefType::Custom,
            field_path: "spec.ref".into(),
            field_name: "ref".into(),
            confidence: 0.9,
            detection_method: DetectionMethod::PatternMatch,
            discovered_at: Utc::now(),
            metadata: Default::default(),
        });

        let result = validate_graph(&builder.build());
        assert!(result.is_valid(), "{:?}", result.errors);
    }

    #[test]
    fn out_of_range_confidence_is_reported() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(node("a"));
        let b = builder.add_node(node("b"));
        builder.add_edge(ResourceEdge {
            id: String::new(),
            source: a,
            target: b,
            relation_type: RefType::Custom,
            field_path: "spec.ref".into(),
            field_name: "ref".into(),
            confidence: 1.5,
            detection_method: DetectionMethod::PatternMatch,
            discovered_at: Utc::now(),
            metadata: Default::default(),
        });

        let result = validate_graph(&builder.build());
        assert!(result.errors.iter().any(|e| e.code == "I6"));
    }
}
