//! Demo fixture data for the `discover` and `traverse` subcommands: a
//! `KubeCluster` that references a `ProviderConfig`, a `GithubProvider`, and
//! a `KubEnv`, plus the two CRDs the discovery scenario enumerates. Grounded
//! in this repository's own demo scenario rather than any live cluster.

use kubegraph_client::{CrdManifest, CrdNames, CrdScope, CrdVersion, FakeClusterClient};
use kubegraph_model::Gvr;
use serde_json::{json, Value};

pub fn demo_client() -> FakeClusterClient {
    FakeClusterClient::new()
        .with_crd(kube_cluster_crd())
        .with_crd(github_project_crd())
        .with_object(
            Gvr::new("aws.platform.kubecore.io", "v1", "providerconfigs"),
            None,
            "aws-default".to_string(),
            json!({
                "metadata": {"name": "aws-default"},
                "spec": {"region": "us-east-1"},
            }),
        )
        .with_object(
            Gvr::new("github.platform.kubecore.io", "v1", "githubproviders"),
            None,
            "primary".to_string(),
            json!({
                "metadata": {"name": "primary"},
                "spec": {"org": "kubecore"},
            }),
        )
        .with_object(
            Gvr::new("platform.kubecore.io", "v1", "kubenvs"),
            Some("default".to_string()),
            "prod-env".to_string(),
            json!({
                "metadata": {"name": "prod-env", "namespace": "default"},
                "spec": {"tier": "production"},
            }),
        )
}

/// The root object handed to the engine as the traversal's starting point.
/// `providerConfigRef`/`githubProviderRef`/`kubEnvRef` are plain string
/// fields; the schema's field descriptions are what let the detector flag
/// them as references (no naming convention like `*Ref` is assumed here).
pub fn demo_kube_cluster(name: &str, namespace: &str) -> Value {
    json!({
        "metadata": {"name": name, "namespace": namespace},
        "spec": {
            "region": "us-east-1",
            "providerConfigRef": "aws-default",
            "githubProviderRef": "primary",
            "kubEnvRef": "prod-env",
        },
    })
}

fn kube_cluster_crd() -> CrdManifest {
    CrdManifest {
        name: "kubeclusters.platform.kubecore.io".to_string(),
        group: "platform.kubecore.io".to_string(),
        scope: CrdScope::Namespaced,
        names: CrdNames {
            kind: "KubeCluster".to_string(),
            plural: "kubeclusters".to_string(),
            singular: "kubecluster".to_string(),
            short_names: vec![],
            categories: vec![],
        },
        resource_version: "1".to_string(),
        versions: vec![CrdVersion {
            name: "v1".to_string(),
            served: true,
            storage: true,
            schema: Some(json!({
                "type": "object",
                "properties": {
                    "region": {"type": "string"},
                    "providerConfigRef": {
                        "type": "string",
                        "description": "name of the ProviderConfig backing this cluster",
                    },
                    "githubProviderRef": {
                        "type": "string",
                        "description": "name of the GithubProvider used for repo automation",
                    },
                    "kubEnvRef": {
                        "type": "string",
                        "description": "name of the KubEnv this cluster belongs to",
                    },
                },
                "required": ["region"],
            })),
        }],
    }
}

fn github_project_crd() -> CrdManifest {
    CrdManifest {
        name: "githubprojects.github.platform.kubecore.io".to_string(),
        group: "github.platform.kubecore.io".to_string(),
        scope: CrdScope::Cluster,
        names: CrdNames {
            kind: "GithubProject".to_string(),
            plural: "githubprojects".to_string(),
            singular: "githubproject".to_string(),
            short_names: vec![],
            categories: vec![],
        },
        resource_version: "1".to_string(),
        versions: vec![CrdVersion {
            name: "v1".to_string(),
            served: true,
            storage: true,
            schema: Some(json!({
                "type": "object",
                "properties": {"repo": {"type": "string"}},
            })),
        }],
    }
}
