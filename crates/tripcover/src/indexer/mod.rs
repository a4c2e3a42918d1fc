//! Indexer querying, response caching, and wire normalization.

mod cache;
mod client;
pub(crate) mod normalize;

pub use cache::{CacheError, QueryCache};
pub use client::{IndexerClient, QueryConfig, QueryError};
pub use normalize::{normalize_address, NormalizeError};
