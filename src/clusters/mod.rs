pub mod cache;
pub mod client;
pub mod source;
pub mod types;

pub use cache::{CacheConfig, ResponseCache};
pub use client::create_client;
pub use source::{ClusterSource, SourceError};
pub use types::{Cluster, StructureQuality, TGroupShare, TaxonomySummary};
