//! In-memory fake cluster, used by integration tests and the demo CLI.
//! Modeled on `familiar-router`'s `InMemoryTelemetryProvider`/
//! `MockTelemetryProvider`: a `RwLock`-guarded `HashMap` plus builder-style
//! `add_*` methods, no networking.

use crate::error::ClientError;
use crate::traits::{DynamicClusterClient, TypedClusterClient};
use crate::types::CrdManifest;
use kubegraph_model::Gvr;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct FakeClusterClient {
    crds: RwLock<Vec<CrdManifest>>,
    objects: RwLock<HashMap<(Gvr, Option<String>, String), serde_json::Value>>,
    /// Objects present in this set are reported as `forbidden` instead of
    /// looked up, for exercising §7's error-classification paths.
    forbidden: RwLock<std::collections::HashSet<(Gvr, Option<String>, String)>>,
}

impl FakeClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crd(self, crd: CrdManifest) -> Self {
        self.crds.write().unwrap().push(crd);
        self
    }

    pub fn with_object(self, gvr: Gvr, namespace: Option<String>, name: String, value: serde_json::Value) -> Self {
        self.objects.write().unwrap().insert((gvr, namespace, name), value);
        self
    }

    pub fn with_forbidden(self, gvr: Gvr, namespace: Option<String>, name: String) -> Self {
        self.forbidden.write().unwrap().insert((gvr, namespace, name));
        self
    }
}

#[async_trait::async_trait]
impl TypedClusterClient for FakeClusterClient {
    async fn list_crds(&self, _label_selector: Option<&str>) -> Result<Vec<CrdManifest>, ClientError> {
        Ok(self.crds.read().unwrap().clone())
    }
}

#[async_trait::async_trait]
impl DynamicClusterClient for FakeClusterClient {
    async fn get_object(
        &self,
        gvr: &Gvr,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<serde_json::Value, ClientError> {
        let key = (gvr.clone(), namespace.map(str::to_string), name.to_string());

        if self.forbidden.read().unwrap().contains(&key) {
            return Err(ClientError::Forbidden {
                resource: format!("{gvr} {}/{}", namespace.unwrap_or("-"), name),
            });
        }

        self.objects
            .read()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                resource: format!("{gvr} {}/{}", namespace.unwrap_or("-"), name),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CrdNames, CrdScope, CrdVersion};
    use serde_json::json;

    fn sample_crd() -> CrdManifest {
        CrdManifest {
            name: "kubeclusters.platform.kubecore.io".into(),
            group: "platform.kubecore.io".into(),
            scope: CrdScope::Namespaced,
            names: CrdNames {
                kind: "KubeCluster".into(),
                plural: "kubeclusters".into(),
                singular: "kubecluster".into(),
                short_names: vec![],
                categories: vec![],
            },
            resource_version: "1".into(),
            versions: vec![CrdVersion {
                name: "v1".into(),
                served: true,
                storage: true,
                schema: Some(json!({"type": "object"})),
            }],
        }
    }

    #[tokio::test]
    async fn lists_seeded_crds() {
        let client = FakeClusterClient::new().with_crd(sample_crd());
        let crds = client.list_crds(None).await.unwrap();
        assert_eq!(crds.len(), 1);
        assert_eq!(crds[0].name, "kubeclusters.platform.kubecore.io");
    }

    #[tokio::test]
    async fn get_object_reports_not_found_for_unseeded_objects() {
        let client = FakeClusterClient::new();
        let gvr = Gvr::new("", "v1", "configmaps");
        let err = client.get_object(&gvr, Some("default"), "missing").await.unwrap_err();
        assert_eq!(err.skip_reason(), "not_found");
    }

    #[tokio::test]
    async fn get_object_reports_forbidden_when_marked() {
        let gvr = Gvr::new("", "v1", "secrets");
        let client = FakeClusterClient::new().with_forbidden(gvr.clone(), Some("default".into()), "tls".into());
        let err = client.get_object(&gvr, Some("default"), "tls").await.unwrap_err();
        assert_eq!(err.skip_reason(), "forbidden");
    }
}
