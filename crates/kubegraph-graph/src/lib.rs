//! Graph model, builder, cycle detector, traverser, and path tracker
//! (spec §4.D). Grounded on the teacher's `familiar-graph` crate shape
//! (renamed to the spec's own module vocabulary: `model`/`builder`/
//! `cycles`/`traverse`/`paths`/`validate`).

pub mod builder;
pub mod cycles;
pub mod model;
pub mod paths;
pub mod traverse;
pub mod validate;

pub use builder::GraphBuilder;
pub use cycles::{detect_cycles, has_cycle, Cycle, CycleReport};
pub use model::{Graph, GraphStats};
pub use paths::{DiscoveryPath, PathMetadata, PathTracker};
pub use traverse::{bfs, dfs, find_all_paths, reverse_bfs, shortest_path, topological_sort, BfsResult, DepthBoundedVisitation, TopoResult, VisitationStrategy};
pub use validate::{validate_graph, Severity, ValidationIssue, ValidationResult};
