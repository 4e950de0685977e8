/// Errors surfaced by the discovery pass (§4.C).
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("cluster client failed while listing CRDs: {0}")]
    Client(#[from] kubegraph_client::ClientError),

    #[error("failed to parse schema for {crd}: {source}")]
    Schema {
        crd: String,
        #[source]
        source: kubegraph_schema::SchemaParseError,
    },

    #[error("discovery timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("discovery was cancelled")]
    Cancelled,
}
