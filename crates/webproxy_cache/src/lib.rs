//! Bounded in-memory object cache with LRU eviction.
//!
//! Keys are literal request URIs; payloads are complete origin responses.

mod entry;
mod policy;
mod stats;
mod store;

pub use stats::CacheStats;
pub use store::{ObjectCache, StoreOutcome};
pub use webproxy_config::CacheLimits;
