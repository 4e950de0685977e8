mod error;
mod fake;
mod traits;
mod types;

pub use error::ClientError;
pub use fake::FakeClusterClient;
pub use traits::{ClusterClient, DynamicClusterClient, TypedClusterClient};
pub use types::{CrdManifest, CrdNames, CrdScope, CrdVersion};
