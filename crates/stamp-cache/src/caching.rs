use std::collections::HashMap;
use std::marker::PhantomData;

use stamp_crypto::{Hash, SupportedDigest};
use stamp_merkle::{MerkleError, NodeCache};

use crate::backend::NodeCacheBackend;

/// Default small-subtree threshold `W` (spec.md §4.C: "128 is a reasonable
/// default").
pub const DEFAULT_SMALL_SUBTREE_THRESHOLD: u64 = 128;

fn key(a: u64, b: u64) -> String {
    format!("{a},{b}")
}

/// The caching layer proper (spec.md §4.C): wraps a raw [`NodeCacheBackend`]
/// with the small-subtree write policy and the content-addressable
/// corruption check. This is what the main tree is built through; the
/// interval tree within one scheduler tick uses
/// [`stamp_merkle::NoCache`] instead, since it is thrown away at the end of
/// the tick.
pub struct CachingNodeCache<D: SupportedDigest, B: NodeCacheBackend> {
    backend: B,
    small_subtree_threshold: u64,
    _digest: PhantomData<D>,
}

impl<D: SupportedDigest, B: NodeCacheBackend> CachingNodeCache<D, B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            small_subtree_threshold: DEFAULT_SMALL_SUBTREE_THRESHOLD,
            _digest: PhantomData,
        }
    }

    pub fn with_threshold(backend: B, small_subtree_threshold: u64) -> Self {
        Self {
            backend,
            small_subtree_threshold,
            _digest: PhantomData,
        }
    }

    /// Populates the cache with `(start, end) -> value` pairs produced by
    /// [`stamp_merkle::from_sequence`] (spec.md §4.C "Seeding"). Subject to
    /// the same small-subtree policy and corruption check as ordinary
    /// writes.
    pub fn seed(&self, nodes: HashMap<(u64, u64), Hash<D>>) -> Result<(), MerkleError> {
        for ((a, b), value) in nodes {
            self.put(a, b, value)?;
        }
        Ok(())
    }
}

impl<D: SupportedDigest, B: NodeCacheBackend> NodeCache<D> for CachingNodeCache<D, B> {
    fn get(&self, a: u64, b: u64) -> Result<Option<Hash<D>>, MerkleError> {
        let raw = self
            .backend
            .get_raw(&key(a, b))
            .map_err(MerkleError::CacheBackend)?;
        raw.map(Hash::try_from)
            .transpose()
            .map_err(|e| MerkleError::CacheBackend(e.into()))
    }

    fn put(&self, a: u64, b: u64, value: Hash<D>) -> Result<(), MerkleError> {
        if b - a <= self.small_subtree_threshold {
            return Ok(());
        }
        let k = key(a, b);
        if let Some(existing) = self.backend.get_raw(&k).map_err(MerkleError::CacheBackend)? {
            if existing != value.bytes() {
                return Err(MerkleError::CacheCorruption { start: a, end: b });
            }
            return Ok(());
        }
        self.backend
            .put_raw(&k, value.bytes().to_vec())
            .map_err(MerkleError::CacheBackend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryKv;
    use sha2::Sha512;
    use std::time::Duration;
    use stamp_merkle::{tree_root, SliceOracle};

    #[test]
    fn caching_does_not_change_the_computed_root() {
        let leaves: Vec<Vec<u8>> = (0..20u8).map(|i| vec![i]).collect();
        let oracle = SliceOracle::new(&leaves);

        let uncached: stamp_crypto::MerkleNode<Sha512> =
            tree_root(&oracle, &stamp_merkle::NoCache, 20).unwrap();

        let cache: CachingNodeCache<Sha512, _> =
            CachingNodeCache::with_threshold(InMemoryKv::new(Duration::from_secs(3600)), 2);
        let cached = tree_root(&oracle, &cache, 20).unwrap();
        assert_eq!(uncached.value, cached.value);
    }

    #[test]
    fn small_subtrees_are_never_written() {
        let leaves: Vec<Vec<u8>> = (0..4u8).map(|i| vec![i]).collect();
        let oracle = SliceOracle::new(&leaves);
        let backend = InMemoryKv::new(Duration::from_secs(3600));
        let cache: CachingNodeCache<Sha512, _> = CachingNodeCache::with_threshold(backend, 128);
        let _ = tree_root(&oracle, &cache, 4).unwrap();
        assert!(cache.backend.is_empty());
    }

    #[test]
    fn rewriting_a_different_value_at_the_same_address_is_corruption() {
        let backend = InMemoryKv::new(Duration::from_secs(3600));
        let cache: CachingNodeCache<Sha512, _> = CachingNodeCache::with_threshold(backend, 0);
        let a: Hash<Sha512> = Hash::of(&(0u8, 1u8));
        let b: Hash<Sha512> = Hash::of(&(0u8, 2u8));
        cache.put(0, 200, a).unwrap();
        let err = cache.put(0, 200, b).unwrap_err();
        assert!(matches!(err, MerkleError::CacheCorruption { .. }));
    }
}
