use serde::{Deserialize, Serialize};

/// A single CRD's processing failure, collected rather than propagated
/// (§7 "CRD processing error ... per-CRD; collected into
/// `DiscoveryStatistics.errors`; aggregate succeeds").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrdError {
    pub crd_name: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryStatistics {
    pub crds_listed: usize,
    pub crds_matched: usize,
    pub crds_parsed: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub errors: Vec<CrdError>,
    pub duration_ms: u64,
}
