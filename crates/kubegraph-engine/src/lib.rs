//! Traversal Engine (spec §4.F): the crate that wires schema registry,
//! reference detection, CRD discovery, and reference resolution into a
//! single bounded concurrent breadth-first discovery engine.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod scope;
pub mod tracker;

pub use config::{BatchKey, BatchingConfig, OnCycleDetected, RegistryMode, ScopeFilterConfig, TraversalConfig, TraversalDirection};
pub use engine::{TerminationReason, TraversalEngine, TraversalResult, TraversalRoot};
pub use error::EngineError;
pub use metrics::{DepthStats, TraversalMetrics, TraversalStep};
pub use scope::{ScopeCandidate, ScopeFilter};
pub use tracker::ResourceTracker;
