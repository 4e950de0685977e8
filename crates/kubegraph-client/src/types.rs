use serde::{Deserialize, Serialize};

/// Wire shape of a `CustomResourceDefinition`, trimmed to the fields the
/// discoverer needs (§4.C). Deliberately independent of any particular
/// Kubernetes client crate's generated types, so the core never has a hard
/// dependency on one — a concrete adapter in the outer shell is expected to
/// translate from `k8s-openapi`/`kube` types into this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrdManifest {
    pub name: String,
    pub group: String,
    pub scope: CrdScope,
    pub names: CrdNames,
    pub resource_version: String,
    pub versions: Vec<CrdVersion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum CrdScope {
    Namespaced,
    Cluster,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrdNames {
    pub kind: String,
    pub plural: String,
    pub singular: String,
    #[serde(default)]
    pub short_names: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrdVersion {
    pub name: String,
    pub served: bool,
    pub storage: bool,
    /// The version's `openAPIV3Schema`, already decoded to JSON. `None` when
    /// the CRD declares no schema for this version.
    pub schema: Option<serde_json::Value>,
}

impl CrdManifest {
    /// Selects the storage version if one is marked `storage: true`,
    /// otherwise falls back to the last declared version (§4.C).
    pub fn storage_or_last_version(&self) -> Option<&CrdVersion> {
        self.versions
            .iter()
            .find(|v| v.storage)
            .or_else(|| self.versions.last())
    }
}
