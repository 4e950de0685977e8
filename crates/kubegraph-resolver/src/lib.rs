//! Reference Resolver (spec §4.E): turns a detected `ReferenceField` plus a
//! source object into concrete target objects, fetched through a
//! `DynamicClusterClient` and cached for the life of a traversal.

pub mod cache;
pub mod error;
pub mod extract;
pub mod gvr;
pub mod resolver;

pub use cache::TtlCache;
pub use error::ResolverError;
pub use extract::{extract_reference_values, ExtractedRef};
pub use gvr::{pluralize, PluralRegistry};
pub use resolver::{ReferenceResolver, ResolvedReference, DEFAULT_MIN_CONFIDENCE};
