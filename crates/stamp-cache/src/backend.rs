use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// The raw key-value contract a node cache is built on (spec.md §6
/// "Node-cache interface (consumed)"): a mapping from an `"a,b"`-shaped
/// keyspace to raw digest bytes. [`super::CachingNodeCache`] is the policy
/// layer (small-subtree skip, content-addressable corruption check) on top
/// of one of these; production deployments would implement this trait
/// against a shared KV store, the way `original_source/cache.py`'s
/// `MerkleNodeCache` is abstract over its own `_getc`/`_setc`.
pub trait NodeCacheBackend: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, anyhow::Error>;
    fn put_raw(&self, key: &str, value: Vec<u8>) -> Result<(), anyhow::Error>;
}

/// The in-process reference backend (`original_source/cache.py`'s
/// `DictMerkleNodeCache`, generalized with a TTL). Entries older than `ttl`
/// are treated as a miss and evicted lazily on next read — this is purely
/// an optimisation per spec.md §4.C, since (I1) guarantees a recomputed
/// value is identical.
pub struct InMemoryKv {
    entries: Mutex<HashMap<String, (Instant, Vec<u8>)>>,
    ttl: Duration,
}

impl InMemoryKv {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NodeCacheBackend for InMemoryKv {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, anyhow::Error> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((inserted_at, _)) if inserted_at.elapsed() > self.ttl => {
                entries.remove(key);
                Ok(None)
            }
            Some((_, value)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    fn put_raw(&self, key: &str, value: Vec<u8>) -> Result<(), anyhow::Error> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (Instant::now(), value));
        Ok(())
    }
}
