use kubegraph_client::ClientError;

/// Failures the resolver can surface for a single reference (spec §4.E
/// step 5 and §7: "never fail the whole traversal — the edge is dropped, a
/// `skippedReference` is recorded on the source node with reason").
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("reference at {field_path} failed validation: {reason}")]
    InvalidReference { field_path: String, reason: String },

    #[error("could not extract a reference value at {field_path}")]
    ExtractionFailed { field_path: String },

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ResolverError {
    /// The stable reason string recorded on a node's `skippedReference`.
    pub fn skip_reason(&self) -> &'static str {
        match self {
            ResolverError::InvalidReference { .. } => "invalid_reference",
            ResolverError::ExtractionFailed { .. } => "extraction_failed",
            ResolverError::Client(client_err) => client_err.skip_reason(),
        }
    }
}
