//! Traversal metrics (spec §2 "a metrics collector" is cross-cutting,
//! §4.F "collects metrics"). Modeled on the teacher's
//! `ResourceUtilization`/`TelemetrySnapshot` reporting structs: plain
//! serializable data, assembled by the engine rather than pushed into by
//! scattered call sites.

use serde::{Deserialize, Serialize};

/// Per-depth counters recorded alongside each `TraversalStep` (§4.F.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepthStats {
    pub depth: u32,
    pub frontier_size: usize,
    pub nodes_added: usize,
    pub edges_added: usize,
    pub duration_ms: u64,
}

/// Aggregate counters for a single `run_traversal` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraversalMetrics {
    pub nodes_discovered: usize,
    pub edges_discovered: usize,
    pub references_found: usize,
    pub references_followed: usize,
    pub references_skipped: usize,
    pub cache_hits: usize,
    pub duration_ms: u64,
    pub per_depth: Vec<DepthStats>,
}

/// A single step in the traversal's path log (§4.F.3 "Append a
/// `TraversalStep{depth, action, referencesFound, referencesFollowed,
/// duration}` to the path log").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalStep {
    pub depth: u32,
    pub action: String,
    pub references_found: usize,
    pub references_followed: usize,
    pub duration_ms: u64,
}
