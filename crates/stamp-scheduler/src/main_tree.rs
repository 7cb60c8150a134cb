use std::sync::{Arc, Mutex};

use stamp_crypto::{Hash, SupportedDigest};
use stamp_merkle::{LeafOracle, MerkleError};

/// The main tree's leaf oracle (spec.md §9: "the trivial 'look up stored
/// ITH' oracle for the main tree"). Leaf `i` of the main tree is interval
/// `i`'s ITH digest, treated as canonical leaf bytes.
///
/// Held in memory for the lifetime of one scheduler: this reference
/// implementation does not reconstruct history from the submission store on
/// restart, since durable storage is an external collaborator (spec.md
/// §1) and the store interface of spec.md §6 has no "read interval by
/// index" operation to reconstruct it from.
#[derive(Clone)]
pub struct MainTreeOracle<D: SupportedDigest> {
    history: Arc<Mutex<Vec<Hash<D>>>>,
}

impl<D: SupportedDigest> MainTreeOracle<D> {
    pub fn new() -> Self {
        Self {
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push(&self, ith: Hash<D>) {
        self.history.lock().unwrap().push(ith);
    }

    pub fn width(&self) -> u64 {
        self.history.lock().unwrap().len() as u64
    }
}

impl<D: SupportedDigest> LeafOracle<D> for MainTreeOracle<D> {
    fn leaf_bytes(&self, index: u64) -> Result<Vec<u8>, MerkleError> {
        self.history
            .lock()
            .unwrap()
            .get(index as usize)
            .map(|h| h.bytes().to_vec())
            .ok_or_else(|| MerkleError::Oracle {
                index,
                source: anyhow::anyhow!("no interval tree head recorded for interval {index}"),
            })
    }
}

/// A view of [`MainTreeOracle`] with one not-yet-committed leaf appended,
/// used to build and self-verify the extended main tree before the
/// scheduler has decided the tick will succeed. `base` is only mutated by
/// [`MainTreeOracle::push`] once every self-verification step has passed, so
/// a tick that fails partway through never leaves the in-memory history
/// ahead of what the store actually committed.
pub struct StagedLeaf<'a, D: SupportedDigest> {
    base: &'a MainTreeOracle<D>,
    pending_index: u64,
    pending_bytes: Vec<u8>,
}

impl<'a, D: SupportedDigest> StagedLeaf<'a, D> {
    pub fn new(base: &'a MainTreeOracle<D>, pending_index: u64, pending: &Hash<D>) -> Self {
        Self {
            base,
            pending_index,
            pending_bytes: pending.bytes().to_vec(),
        }
    }
}

impl<'a, D: SupportedDigest> LeafOracle<D> for StagedLeaf<'a, D> {
    fn leaf_bytes(&self, index: u64) -> Result<Vec<u8>, MerkleError> {
        if index == self.pending_index {
            Ok(self.pending_bytes.clone())
        } else {
            self.base.leaf_bytes(index)
        }
    }
}
