//! Path tracker (spec §4.D): records discovery paths with provenance
//! metadata (cumulative confidence, cross-namespace hops, platform-boundary
//! crossings) and tags the shortest path per target as `optimal`.

use crate::model::Graph;
use crate::traverse::{find_all_paths, shortest_path};
use kubegraph_model::PathType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathMetadata {
    pub cumulative_confidence_product: f64,
    pub cumulative_confidence_average: f64,
    pub min_confidence: f64,
    pub cross_namespace_hops: usize,
    pub platform_boundary_crossings: usize,
    /// Tagged `true` for the single shortest path to a given target (§4.D
    /// "Shortest path per target is tagged `optimal`").
    pub optimal: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryPath {
    pub source: String,
    pub target: String,
    pub nodes: Vec<String>,
    pub edges: Vec<String>,
    pub length: usize,
    pub depth: u32,
    pub path_type: PathType,
    pub metadata: PathMetadata,
}

pub struct PathTracker;

impl PathTracker {
    /// The shortest discovery path from `source` to `target`, if one
    /// exists.
    pub fn track(graph: &Graph, source: &str, target: &str) -> Option<DiscoveryPath> {
        let node_path = shortest_path(graph, source, target)?;
        Self::from_node_path(graph, &node_path, true)
    }

    /// Every path up to `max_depth` hops, with the shortest (if present)
    /// tagged `optimal`.
    pub fn all_paths(graph: &Graph, source: &str, target: &str, max_depth: usize) -> Vec<DiscoveryPath> {
        let optimal = shortest_path(graph, source, target);
        find_all_paths(graph, source, target, max_depth)
            .into_iter()
            .filter_map(|node_path| {
                let is_optimal = optimal.as_ref() == Some(&node_path);
                Self::from_node_path(graph, &node_path, is_optimal)
            })
            .collect()
    }

    fn from_node_path(graph: &Graph, node_path: &[String], optimal: bool) -> Option<DiscoveryPath> {
        if node_path.is_empty() {
            return None;
        }
        let mut edges = Vec::new();
        let mut confidences = Vec::new();
        let mut relation_types = Vec::new();
        let mut cross_namespace_hops = 0;
        let mut platform_boundary_crossings = 0;

        for pair in node_path.windows(2) {
            let edge = graph.outgoing(&pair[0]).find(|e| e.target == pair[1])?;
            edges.push(edge.id.clone());
            confidences.push(edge.confidence);
            relation_types.push(edge.relation_type);
            if edge.metadata.is_cross_namespace {
                cross_namespace_hops += 1;
            }
            let source_platform = graph.node(&pair[0]).map(|n| n.platform).unwrap_or(false);
            let target_platform = graph.node(&pair[1]).map(|n| n.platform).unwrap_or(false);
            if source_platform != target_platform {
                platform_boundary_crossings += 1;
            }
        }

        let product = confidences.iter().product();
        let average = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f64>() / confidences.len() as f64
        };
        let min_confidence = confidences.iter().cloned().fold(f64::INFINITY, f64::min);

        Some(DiscoveryPath {
            source: node_path[0].clone(),
            target: node_path[node_path.len() - 1].clone(),
            nodes: node_path.to_vec(),
            edges,
            length: node_path.len() - 1,
            depth: (node_path.len() - 1) as u32,
            path_type: PathType::infer(&relation_types),
            metadata: PathMetadata {
                cumulative_confidence_product: product,
                cumulative_confidence_average: average,
                min_confidence: if min_confidence.is_finite() { min_confidence } else { 0.0 },
                cross_namespace_hops,
                platform_boundary_crossings,
                optimal,
            },
        })
    }
}
