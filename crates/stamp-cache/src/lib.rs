//! The caching layer described in spec.md §4.C: a [`stamp_merkle::NodeCache`]
//! implementation with a small-subtree write policy and TTL'd backing store,
//! so extending the main tree by one leaf per interval tick reads and hashes
//! only the minimum necessary data.

mod backend;
mod caching;

pub use backend::{InMemoryKv, NodeCacheBackend};
pub use caching::{CachingNodeCache, DEFAULT_SMALL_SUBTREE_THRESHOLD};
