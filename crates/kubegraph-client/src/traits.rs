use crate::error::ClientError;
use crate::types::CrdManifest;
use kubegraph_model::Gvr;

/// The typed client: cluster-wide CRD enumeration (§6 "a typed client
/// providing `list CustomResourceDefinitions`").
#[async_trait::async_trait]
pub trait TypedClusterClient: Send + Sync {
    async fn list_crds(&self, label_selector: Option<&str>) -> Result<Vec<CrdManifest>, ClientError>;
}

/// The dynamic client: fetch an arbitrary object by GVR + optional namespace
/// + name (§6 "a dynamic client supporting `get (namespace?, name)` for
/// arbitrary Group-Version-Resource triples"). Returns the object as JSON;
/// the resolver and reference detector operate on that representation
/// directly rather than a statically typed struct.
#[async_trait::async_trait]
pub trait DynamicClusterClient: Send + Sync {
    async fn get_object(
        &self,
        gvr: &Gvr,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<serde_json::Value, ClientError>;
}

/// The combined cluster client contract the engine depends on.
pub trait ClusterClient: TypedClusterClient + DynamicClusterClient {}
impl<T: TypedClusterClient + DynamicClusterClient> ClusterClient for T {}
