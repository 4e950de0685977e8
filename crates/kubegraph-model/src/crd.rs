use crate::schema::ResourceSchema;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ancillary CRD metadata carried through for diagnostics and UI rendering;
/// none of it participates in identity or caching decisions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CRDMetadata {
    pub labels: std::collections::BTreeMap<String, String>,
    pub annotations: std::collections::BTreeMap<String, String>,
    pub categories: Vec<String>,
    pub short_names: Vec<String>,
}

/// A discovered CRD, its selected storage version, and that version's
/// parsed schema (§3 `CRDInfo`). Recreated whenever the CRD's
/// `resourceVersion` changes (see the discovery cache, §4.C).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CRDInfo {
    pub name: String,
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
    pub singular: String,
    pub namespaced: bool,
    /// `None` when schema parsing failed for this CRD version; discovery
    /// continues without it (§4.C, §7 "Schema parse error").
    pub schema: Option<ResourceSchema>,
    pub metadata: CRDMetadata,
    pub parsed_at: DateTime<Utc>,
    /// The CRD's `resourceVersion` at the time this was parsed; used as
    /// half of the discovery cache key.
    pub resource_version: String,
}
