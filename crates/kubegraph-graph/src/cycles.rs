//! Cycle detector (spec §4.D): DFS back-edge enumeration for individual
//! cycles, plus Tarjan SCC for global structural analysis.

use crate::model::Graph;
use kubegraph_model::RefType;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cycle {
    pub nodes: Vec<String>,
    pub edges: Vec<String>,
    /// No repeated interior node — always true for a cycle produced by the
    /// DFS back-edge walk below, since the path it closes is itself
    /// repeat-free by construction (§4.D "simple (no repeated interior
    /// node) or complex").
    pub is_simple: bool,
    pub weight: f64,
    pub relation_types: Vec<RefType>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleReport {
    pub has_cycle: bool,
    pub cycles: Vec<Cycle>,
    /// Strongly connected components of size > 1, or containing a
    /// self-loop, from the global Tarjan pass (§4.D).
    pub cyclic_components: Vec<Vec<String>>,
}

/// Quick existence check, short-circuiting as soon as one back-edge is
/// found — cheaper than enumerating every cycle.
pub fn has_cycle(graph: &Graph) -> bool {
    let mut visited = HashSet::new();
    let mut on_stack = HashSet::new();
    for start in graph.node_ids() {
        if visited.contains(start) {
            continue;
        }
        if dfs_has_cycle(graph, start, &mut visited, &mut on_stack) {
            return true;
        }
    }
    false
}

fn dfs_has_cycle(graph: &Graph, node: &str, visited: &mut HashSet<String>, on_stack: &mut HashSet<String>) -> bool {
    visited.insert(node.to_string());
    on_stack.insert(node.to_string());
    for edge in graph.outgoing(node) {
        if on_stack.contains(&edge.target) {
            return true;
        }
        if !visited.contains(&edge.target) && dfs_has_cycle(graph, &edge.target, visited, on_stack) {
            return true;
        }
    }
    on_stack.remove(node);
    false
}

/// Full cycle detection: DFS back-edge enumeration (bounded by `max_depth`
/// to cap path memory) plus a global Tarjan SCC pass.
pub fn detect_cycles(graph: &Graph, max_depth: usize) -> CycleReport {
    let cycles = enumerate_cycles(graph, max_depth);
    let cyclic_components = tarjan_cyclic_components(graph);
    CycleReport {
        has_cycle: !cycles.is_empty() || !cyclic_components.is_empty(),
        cycles,
        cyclic_components,
    }
}

fn enumerate_cycles(graph: &Graph, max_depth: usize) -> Vec<Cycle> {
    let mut cycles = Vec::new();
    let mut global_visited: HashSet<String> = HashSet::new();

    let start_ids: Vec<String> = graph.node_ids().cloned().collect();
    for start in start_ids {
        if global_visited.contains(&start) {
            continue;
        }
        let mut stack = Vec::new();
        let mut edge_stack: Vec<String> = Vec::new();
        let mut on_stack_pos: HashMap<String, usize> = HashMap::new();
        walk(graph, &start, max_depth, &mut stack, &mut edge_stack, &mut on_stack_pos, &mut global_visited, &mut cycles);
    }
    cycles
}

#[allow(clippy::too_many_arguments)]
fn walk(
    graph: &Graph,
    node: &str,
    max_depth: usize,
    stack: &mut Vec<String>,
    edge_stack: &mut Vec<String>,
    on_stack_pos: &mut HashMap<String, usize>,
    global_visited: &mut HashSet<String>,
    cycles: &mut Vec<Cycle>,
) {
    if stack.len() >= max_depth {
        return;
    }
    stack.push(node.to_string());
    on_stack_pos.insert(node.to_string(), stack.len() - 1);
    global_visited.insert(node.to_string());

    for edge in graph.outgoing(node) {
        if let Some(&pos) = on_stack_pos.get(&edge.target) {
            let mut cycle_nodes = stack[pos..].to_vec();
            cycle_nodes.push(edge.target.clone());
            let mut cycle_edges = edge_stack[pos..].to_vec();
            cycle_edges.push(edge.id.clone());

            let relation_types = relation_types_for(graph, &cycle_edges);
            let weight = cycle_edges
                .iter()
                .filter_map(|id| graph.edge(id))
                .map(|e| e.confidence)
                .sum();

            cycles.push(Cycle {
                nodes: cycle_nodes,
                edges: cycle_edges,
                is_simple: true,
                weight,
                relation_types,
            });
        } else if !global_visited.contains(&edge.target) {
            edge_stack.push(edge.id.clone());
            walk(graph, &edge.target, max_depth, stack, edge_stack, on_stack_pos, global_visited, cycles);
            edge_stack.pop();
        }
    }

    stack.pop();
    on_stack_pos.remove(node);
}

fn relation_types_for(graph: &Graph, edge_ids: &[String]) -> Vec<RefType> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for id in edge_ids {
        if let Some(edge) = graph.edge(id) {
            if seen.insert(std::mem::discriminant(&edge.relation_type)) {
                out.push(edge.relation_type);
            }
        }
    }
    out
}

fn tarjan_cyclic_components(graph: &Graph) -> Vec<Vec<String>> {
    let mut pg = DiGraph::<String, ()>::new();
    let mut index_of: HashMap<String, NodeIndex> = HashMap::new();
    for id in graph.node_ids() {
        let idx = pg.add_node(id.clone());
        index_of.insert(id.clone(), idx);
    }
    for edge in graph.edges() {
        if let (Some(&s), Some(&t)) = (index_of.get(&edge.source), index_of.get(&edge.target)) {
            pg.add_edge(s, t, ());
        }
    }

    tarjan_scc(&pg)
        .into_iter()
        .filter(|component| {
            component.len() > 1 || component.iter().any(|&idx| pg.find_edge(idx, idx).is_some())
        })
        .map(|component| component.into_iter().map(|idx| pg[idx].clone()).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use chrono::Utc;
    use kubegraph_model::{DetectionMethod, NodeMetadata, ResourceEdge, ResourceNode, ResourceRef};

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

    fn edge(id: &str, source: &str, target: &str) -> ResourceEdge {
        ResourceEdge {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            relation_type: RefType::Custom,
            field_path: format!("spec.{id}"),
            field_name: id.to_string(),
            confidence: 0.8,
            detection_method: DetectionMethod::PatternMatch,
            discovered_at: Utc::now(),
            metadata: Default::default(),
        }
    }

    fn abc_cycle() -> Graph {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(node("a"));
        let b = builder.add_node(node("b"));
        let c = builder.add_node(node("c"));
        builder.add_edge(edge("e1", &a, &b));
        builder.add_edge(edge("e2", &b, &c));
        builder.add_edge(edge("e3", &c, &a));
        builder.build()
    }

    #[test]
    fn scenario_5_cycle_containment() {
        let graph = abc_cycle();
        assert!(has_cycle(&graph));

        let report = detect_cycles(&graph, 10);
        assert!(report.has_cycle);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.cycles[0].nodes.len(), 4); // a, b, c, a
        assert!((report.cycles[0].weight - 2.4).abs() < 1e-9);
        assert_eq!(report.cyclic_components.len(), 1);
        assert_eq!(report.cyclic_components[0].len(), 3);
    }

    #[test]
    fn acyclic_graph_reports_no_cycles() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(node("a"));
        let b = builder.add_node(node("b"));
        builder.add_edge(edge("e1", &a, &b));
        let graph = builder.build();

        assert!(!has_cycle(&graph));
        let report = detect_cycles(&graph, 10);
        assert!(!report.has_cycle);
        assert!(report.cycles.is_empty());
    }

    #[test]
    fn self_loop_is_flagged_cyclic_by_tarjan() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(node("a"));
        builder.add_edge(edge("e1", &a, &a));
        let graph = builder.build();

        let report = detect_cycles(&graph, 10);
        assert_eq!(report.cyclic_components.len(), 1);
    }
}
