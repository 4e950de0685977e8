use kubegraph_model::ResourceRef;

/// Cluster API failures, classified the way spec §4.E step 5 requires so
/// the resolver can map each to the right `skippedReference` reason.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("forbidden: {resource}")]
    Forbidden { resource: String },

    #[error("timed out fetching {resource}")]
    Timeout { resource: String },

    #[error("api error fetching {resource}: {message}")]
    Api { resource: String, message: String },
}

impl ClientError {
    /// The stable reason string recorded on a node's `skippedReference`
    /// (§7: "the edge is dropped, a `skippedReference` is recorded on the
    /// source node with reason").
    pub fn skip_reason(&self) -> &'static str {
        match self {
            ClientError::NotFound { .. } => "not_found",
            ClientError::Forbidden { .. } => "forbidden",
            ClientError::Timeout { .. } => "timeout",
            ClientError::Api { .. } => "api_error",
        }
    }

    pub fn not_found(resource_ref: &ResourceRef) -> Self {
        ClientError::NotFound {
            resource: resource_ref.to_string(),
        }
    }
}
