//! `TraversalConfig` and the recognized options from spec §6's
//! configuration surface table. Plain `serde` structs with literal
//! `Default` impls, populated by an outer shell and accepted by value — the
//! engine never reads the environment itself (§9 Design Notes).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `Mode` (§6): selects where the type registry backing schema/reference
/// lookups comes from. `kubegraph-engine` only consults this to decide
/// whether to call the discoverer at all; `embedded`/`dynamic` sourcing of
/// a pre-baked registry is an outer-shell concern (§1 PURPOSE & SCOPE:
/// "the Kubernetes client libraries themselves" are out of scope here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryMode {
    Embedded,
    Dynamic,
    Hybrid,
}

impl Default for RegistryMode {
    fn default() -> Self {
        RegistryMode::Hybrid
    }
}

/// `OnCycleDetected` (§6, §7): the policy applied once the cycle detector
/// (run before the engine returns, and optionally mid-traversal) reports a
/// cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnCycleDetected {
    Continue,
    Stop,
    Fail,
}

impl Default for OnCycleDetected {
    fn default() -> Self {
        OnCycleDetected::Continue
    }
}

/// §4.F: "forward BFS (default) or reverse BFS, or bidirectional
/// (sequential forward then reverse)".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalDirection {
    Forward,
    Reverse,
    Bidirectional,
}

impl Default for TraversalDirection {
    fn default() -> Self {
        TraversalDirection::Forward
    }
}

/// §4.F "Scope filter": resource and reference admission rules. All glob
/// fields are matched case-insensitively; `includeKinds`/`excludeKinds` are
/// exact matches per spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeFilterConfig {
    pub platform_only: bool,
    pub include_api_groups: Vec<String>,
    pub exclude_api_groups: Vec<String>,
    pub include_kinds: Vec<String>,
    pub exclude_kinds: Vec<String>,
    pub include_namespaces: Vec<String>,
    pub exclude_namespaces: Vec<String>,
    pub cross_namespace_enabled: bool,
    /// Glob patterns that mark an API group as "platform" (§3 GLOSSARY
    /// "Platform resource").
    pub platform_api_group_patterns: Vec<String>,
    /// Kinds explicitly platform-tagged regardless of API group.
    pub platform_kinds: Vec<String>,
}

impl Default for ScopeFilterConfig {
    fn default() -> Self {
        Self {
            // §6 default: "platform-only, single-namespace".
            platform_only: true,
            include_api_groups: Vec::new(),
            exclude_api_groups: Vec::new(),
            include_kinds: Vec::new(),
            exclude_kinds: Vec::new(),
            include_namespaces: Vec::new(),
            exclude_namespaces: Vec::new(),
            cross_namespace_enabled: false,
            platform_api_group_patterns: vec!["*.kubecore.io".to_string()],
            platform_kinds: Vec::new(),
        }
    }
}

/// The full recognized configuration surface from spec §6's table, plus
/// the concurrency knobs from §5.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    pub mode: RegistryMode,
    pub api_group_patterns: Vec<String>,
    pub discovery_timeout: Duration,
    pub traversal_timeout: Duration,
    pub fallback_enabled: bool,
    pub ref_patterns: Vec<kubegraph_model::ReferencePattern>,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
    pub max_depth: u32,
    pub max_resources: usize,
    pub scope_filter: ScopeFilterConfig,
    pub min_confidence_threshold: f64,
    pub on_cycle_detected: OnCycleDetected,
    pub direction: TraversalDirection,
    /// §5 "A semaphore caps concurrent in-flight cluster calls at
    /// `MaxConcurrentRequests` (default 10)".
    pub max_concurrent_requests: usize,
    /// §4.F "Optional batching groups frontier items...". `None` disables
    /// batching; `Some` sets the batch size and the pool width (§5 default
    /// 3) used to process batches concurrently.
    pub batching: Option<BatchingConfig>,
    /// §4.F "The engine always runs the cycle detector (if enabled)
    /// before returning."
    pub cycle_detection_enabled: bool,
}

/// §4.F "Batching": groups frontier items by the given strategy before
/// dispatching each batch under its own concurrency slot. The cluster
/// client contract (§6) exposes no batch-level fetch, so within a batch
/// every item still resolves individually; grouping only shapes locality
/// and concurrency, not the wire call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchKey {
    Size,
    Depth,
    ApiGroup,
    Kind,
    Namespace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
    pub group_by: BatchKey,
    pub batch_size: usize,
    pub max_concurrent_batches: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            group_by: BatchKey::Kind,
            batch_size: 10,
            // §5 "Batch processing uses a third pool, default 3."
            max_concurrent_batches: 3,
        }
    }
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            mode: RegistryMode::default(),
            api_group_patterns: vec!["*.kubecore.io".to_string()],
            discovery_timeout: Duration::from_secs(5),
            traversal_timeout: Duration::from_secs(10),
            fallback_enabled: true,
            ref_patterns: Vec::new(),
            cache_enabled: true,
            cache_ttl: Duration::from_secs(600),
            max_depth: 3,
            max_resources: 100,
            scope_filter: ScopeFilterConfig::default(),
            min_confidence_threshold: 0.5,
            on_cycle_detected: OnCycleDetected::default(),
            direction: TraversalDirection::default(),
            max_concurrent_requests: 10,
            batching: None,
            cycle_detection_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_table() {
        let config = TraversalConfig::default();
        assert_eq!(config.mode, RegistryMode::Hybrid);
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.max_resources, 100);
        assert!(config.cache_enabled);
        assert_eq!(config.cache_ttl, Duration::from_secs(600));
        assert_eq!(config.min_confidence_threshold, 0.5);
        assert_eq!(config.on_cycle_detected, OnCycleDetected::Continue);
        assert!(config.scope_filter.platform_only);
        assert!(!config.scope_filter.cross_namespace_enabled);
    }

    #[test]
    fn round_trips_through_json() {
        let config = TraversalConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: TraversalConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_depth, config.max_depth);
    }
}
