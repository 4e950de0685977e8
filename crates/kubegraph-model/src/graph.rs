use crate::identity::{ResourceRef, Uid};
use crate::reference::{DetectionMethod, RefType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reference the traversal engine decided not to follow, recorded on the
/// source node for diagnostics (§7 "a `skippedReference` is recorded").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedReference {
    pub field_path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub api_group: String,
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
    pub inbound_ref_count: usize,
    pub outbound_ref_count: usize,
    pub skipped_references: Vec<SkippedReference>,
}

/// `V` in the graph `G = (V, E)` (§3 `ResourceNode`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    pub id: String,
    pub resource: ResourceRef,
    pub uid: Option<Uid>,
    pub discovered_at: DateTime<Utc>,
    pub discovery_depth: u32,
    /// Node ids from a root to this node, inclusive. Empty for root nodes
    /// (§3 I3).
    pub discovery_path: Vec<String>,
    pub platform: bool,
    pub metadata: NodeMetadata,
}

impl ResourceNode {
    pub fn is_root(&self) -> bool {
        self.discovery_depth == 0 && self.discovery_path.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeMetadata {
    pub is_cross_namespace: bool,
    pub target_exists: bool,
    pub resolution_error: Option<String>,
}

/// `E` in the graph `G = (V, E)` (§3 `ResourceEdge`). Edges are keyed for
/// dedup purposes by `(source, target, field_path)` (§3 I4, P4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub relation_type: RefType,
    pub field_path: String,
    pub field_name: String,
    pub confidence: f64,
    pub detection_method: DetectionMethod,
    pub discovered_at: DateTime<Utc>,
    pub metadata: EdgeMetadata,
}

impl ResourceEdge {
    pub fn dedup_key(&self) -> (String, String, String) {
        (self.source.clone(), self.target.clone(), self.field_path.clone())
    }
}

/// Classification of a discovery path by the mix of relation types it
/// traverses (§4.D path tracker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathType {
    Direct,
    Transitive,
    OwnerChain,
    CustomRef,
    Mixed,
}

impl PathType {
    /// Infers a path type from the ordered set of relation types that a
    /// discovery path traverses (§4.D: "`pathType` ... inferred from the set
    /// of edge relation types along the path").
    pub fn infer(relation_types: &[RefType]) -> Self {
        if relation_types.is_empty() {
            return PathType::Direct;
        }
        if relation_types.len() == 1 {
            return match relation_types[0] {
                RefType::OwnerRef => PathType::OwnerChain,
                RefType::Custom => PathType::CustomRef,
                _ => PathType::Direct,
            };
        }
        let all_owner = relation_types.iter().all(|r| matches!(r, RefType::OwnerRef));
        if all_owner {
            return PathType::OwnerChain;
        }
        let unique: std::collections::HashSet<_> =
            relation_types.iter().map(std::mem::discriminant).collect();
        if unique.len() > 1 {
            PathType::Mixed
        } else {
            PathType::Transitive
        }
    }
}
