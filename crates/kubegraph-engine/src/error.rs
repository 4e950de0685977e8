//! Engine-level failures. Per-reference failures never reach here — the
//! resolver's `ResolverError` is recorded as a `skippedReference` and the
//! traversal carries on (§7). Only the two conditions spec §7 calls out as
//! fatal surface through this type, and both carry the partial result the
//! traversal had produced so far.

use crate::engine::TraversalResult;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("traversal deadline exceeded after {elapsed_ms}ms")]
    Timeout {
        elapsed_ms: u64,
        partial: Box<TraversalResult>,
    },

    #[error("cycle detected and onCycleDetected=fail")]
    CycleDetected { partial: Box<TraversalResult> },
}

impl EngineError {
    pub fn partial(&self) -> &TraversalResult {
        match self {
            EngineError::Timeout { partial, .. } => partial,
            EngineError::CycleDetected { partial } => partial,
        }
    }

    pub fn into_partial(self) -> TraversalResult {
        match self {
            EngineError::Timeout { partial, .. } => *partial,
            EngineError::CycleDetected { partial } => *partial,
        }
    }
}
