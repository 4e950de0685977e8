//! Traverser (spec §4.D): BFS, DFS, reverse BFS, Dijkstra shortest path,
//! bounded all-paths enumeration, and Kahn's topological sort, all gated by
//! a [`VisitationStrategy`].

use crate::model::Graph;
use kubegraph_model::ResourceEdge;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

/// Gates node admission and edge traversal during BFS/DFS (§4.D "A
/// `VisitationStrategy` gates node admission and edge traversal; the
/// default admits all nodes within depth and respects scope filters
/// provided by §4.F").
pub trait VisitationStrategy {
    fn admit_node(&self, node_id: &str, depth: u32) -> bool;
    fn admit_edge(&self, edge: &ResourceEdge) -> bool {
        let _ = edge;
        true
    }
}

/// Admits every node up to `max_depth` and every edge; the traversal
/// engine's own scope filter (§4.F) implements a stricter strategy.
pub struct DepthBoundedVisitation {
    pub max_depth: u32,
}

impl VisitationStrategy for DepthBoundedVisitation {
    fn admit_node(&self, _node_id: &str, depth: u32) -> bool {
        depth <= self.max_depth
    }
}

#[derive(Debug, Clone, Default)]
pub struct BfsResult {
    pub order: Vec<String>,
    pub depths: HashMap<String, u32>,
}

/// Level-by-level BFS from `roots` over the forward adjacency lists.
pub fn bfs(graph: &Graph, roots: &[String], strategy: &dyn VisitationStrategy) -> BfsResult {
    bfs_over(graph, roots, strategy, Direction::Forward)
}

/// BFS over the reverse adjacency lists (spec §3's open question #3:
/// implemented as a first-class reverse walk rather than "forward then
/// reverse", since the reverse adjacency invariant already holds).
pub fn reverse_bfs(graph: &Graph, roots: &[String], strategy: &dyn VisitationStrategy) -> BfsResult {
    bfs_over(graph, roots, strategy, Direction::Reverse)
}

enum Direction {
    Forward,
    Reverse,
}

fn bfs_over(graph: &Graph, roots: &[String], strategy: &dyn VisitationStrategy, direction: Direction) -> BfsResult {
    let mut visited: HashSet<String> = HashSet::new();
    let mut order = Vec::new();
    let mut depths = HashMap::new();
    let mut frontier: Vec<String> = roots.to_vec();

    for root in &frontier {
        visited.insert(root.clone());
        depths.insert(root.clone(), 0);
    }

    let mut depth = 0u32;
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for node in &frontier {
            if !strategy.admit_node(node, depth) {
                continue;
            }
            order.push(node.clone());
            let edges: Box<dyn Iterator<Item = &ResourceEdge>> = match direction {
                Direction::Forward => Box::new(graph.outgoing(node)),
                Direction::Reverse => Box::new(graph.incoming(node)),
            };
            for edge in edges {
                if !strategy.admit_edge(edge) {
                    continue;
                }
                let neighbor = match direction {
                    Direction::Forward => &edge.target,
                    Direction::Reverse => &edge.source,
                };
                if visited.insert(neighbor.clone()) {
                    depths.insert(neighbor.clone(), depth + 1);
                    next.push(neighbor.clone());
                }
            }
        }
        frontier = next;
        depth += 1;
    }

    BfsResult { order, depths }
}

/// Recursive DFS with a pluggable visitor strategy (§4.D "DFS (recursive
/// with a visitor strategy)").
pub fn dfs(graph: &Graph, roots: &[String], strategy: &dyn VisitationStrategy) -> Vec<String> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    for root in roots {
        dfs_visit(graph, root, 0, strategy, &mut visited, &mut order);
    }
    order
}

fn dfs_visit(
    graph: &Graph,
    node: &str,
    depth: u32,
    strategy: &dyn VisitationStrategy,
    visited: &mut HashSet<String>,
    order: &mut Vec<String>,
) {
    if visited.contains(node) || !strategy.admit_node(node, depth) {
        return;
    }
    visited.insert(node.to_string());
    order.push(node.to_string());
    for edge in graph.outgoing(node) {
        if strategy.admit_edge(edge) {
            dfs_visit(graph, &edge.target, depth + 1, strategy, visited, order);
        }
    }
}

/// Dijkstra with uniform unit edge weights over a min-heap (§4.D
/// "`ShortestPath` (Dijkstra with uniform unit weights and a min-heap)").
pub fn shortest_path(graph: &Graph, source: &str, target: &str) -> Option<Vec<String>> {
    if !graph.nodes.contains_key(source) || !graph.nodes.contains_key(target) {
        return None;
    }
    if source == target {
        return Some(vec![source.to_string()]);
    }

    let mut dist: HashMap<String, u32> = HashMap::new();
    let mut prev: HashMap<String, String> = HashMap::new();
    let mut heap = BinaryHeap::new();

    dist.insert(source.to_string(), 0);
    heap.push(Reverse((0u32, source.to_string())));

    while let Some(Reverse((d, node))) = heap.pop() {
        if node == target {
            break;
        }
        if d > *dist.get(&node).unwrap_or(&u32::MAX) {
            continue;
        }
        for edge in graph.outgoing(&node) {
            let candidate = d + 1;
            if candidate < *dist.get(&edge.target).unwrap_or(&u32::MAX) {
                dist.insert(edge.target.clone(), candidate);
                prev.insert(edge.target.clone(), node.clone());
                heap.push(Reverse((candidate, edge.target.clone())));
            }
        }
    }

    if !dist.contains_key(target) {
        return None;
    }

    let mut path = vec![target.to_string()];
    let mut cursor = target.to_string();
    while let Some(p) = prev.get(&cursor) {
        path.push(p.clone());
        cursor = p.clone();
    }
    path.reverse();
    Some(path)
}

/// Enumerates every simple path from `source` to `target` up to
/// `max_depth` hops (§4.D "`FindAllPaths` (DFS enumeration up to
/// `maxDepth`)").
pub fn find_all_paths(graph: &Graph, source: &str, target: &str, max_depth: usize) -> Vec<Vec<String>> {
    let mut results = Vec::new();
    let mut path = vec![source.to_string()];
    let mut visited = HashSet::new();
    visited.insert(source.to_string());
    find_paths_dfs(graph, source, target, max_depth, &mut path, &mut visited, &mut results);
    results
}

fn find_paths_dfs(
    graph: &Graph,
    current: &str,
    target: &str,
    max_depth: usize,
    path: &mut Vec<String>,
    visited: &mut HashSet<String>,
    results: &mut Vec<Vec<String>>,
) {
    if path.len() - 1 >= max_depth {
        return;
    }
    for edge in graph.outgoing(current) {
        if edge.target == target {
            let mut found = path.clone();
            found.push(edge.target.clone());
            results.push(found);
        } else if visited.insert(edge.target.clone()) {
            path.push(edge.target.clone());
            find_paths_dfs(graph, &edge.target, target, max_depth, path, visited, results);
            path.pop();
            visited.remove(&edge.target);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TopoResult {
    pub order: Vec<String>,
    pub cycles_found: bool,
}

/// Kahn's algorithm (§4.D "`TopologicalSort` (Kahn's; reports cycles when
/// the sorted set is smaller than `|V|`)"). Ties are broken by node id for
/// deterministic output.
pub fn topological_sort(graph: &Graph) -> TopoResult {
    let mut in_degree: HashMap<String, usize> = graph.node_ids().map(|id| (id.clone(), 0)).collect();
    for edge in graph.edges() {
        *in_degree.entry(edge.target.clone()).or_insert(0) += 1;
    }

    let mut ready: Vec<String> = in_degree.iter().filter(|(_, &d)| d == 0).map(|(id, _)| id.clone()).collect();
    ready.sort();
    let mut queue: VecDeque<String> = ready.into();

    let mut order = Vec::new();
    while let Some(node) = queue.pop_front() {
        order.push(node.clone());
        let mut newly_ready = Vec::new();
        for edge in graph.outgoing(&node) {
            if let Some(d) = in_degree.get_mut(&edge.target) {
                *d -= 1;
                if *d == 0 {
                    newly_ready.push(edge.target.clone());
                }
            }
        }
        newly_ready.sort();
        for id in newly_ready {
            queue.push_back(id);
        }
    }

    TopoResult {
        cycles_found: order.len() < graph.len(),
        order,
    }
}
