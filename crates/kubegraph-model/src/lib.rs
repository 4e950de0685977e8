//! Shared data model for the resource schema registry and transitive
//! discovery engine.
//!
//! Every other crate in the workspace builds on these types; this crate has
//! no I/O and no async, so it can be depended on from anywhere without
//! pulling in a runtime.

pub mod crd;
pub mod graph;
pub mod identity;
pub mod reference;
pub mod schema;

pub use crd::{CRDInfo, CRDMetadata};
pub use graph::{EdgeMetadata, NodeMetadata, PathType, ResourceEdge, ResourceNode, SkippedReference};
pub use identity::{Gvr, ResourceRef, Uid};
pub use reference::{DetectionMethod, RefType, ReferenceField, ReferencePattern};
pub use schema::{FieldDefinition, FieldType, ResourceSchema};
