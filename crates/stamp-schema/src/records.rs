use serde::{Deserialize, Serialize};
use stamp_crypto::{Hash, SupportedDigest};
use uuid::Uuid;

/// `(id, timestamp, leaf_hash, tag, interval, proof)` (spec.md §3
/// "Submission record"). `interval` and `proof` are `None` until sealed,
/// and per (I4) `interval` never changes once set.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SubmissionRecord<D: SupportedDigest> {
    pub id: Uuid,
    pub timestamp: String,
    pub leaf_hash: Hash<D>,
    pub tag: Option<String>,
    pub interval: Option<u64>,
    pub proof: Option<Vec<u8>>,
}

impl<D: SupportedDigest> SubmissionRecord<D> {
    pub fn new_unsealed(id: Uuid, timestamp: String, leaf_hash: Hash<D>, tag: Option<String>) -> Self {
        Self {
            id,
            timestamp,
            leaf_hash,
            tag,
            interval: None,
            proof: None,
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.interval.is_some()
    }
}

/// `(index, timestamp, ith)` (spec.md §3 "Interval"). `index` is dense
/// starting at 0, assigned in commit order (I3).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct IntervalRecord<D: SupportedDigest> {
    pub index: u64,
    pub timestamp: String,
    pub ith: Hash<D>,
}

/// The canonical CBOR proof structure attached to a sealed submission
/// (spec.md §6 "Proof structure (CBOR, canonical)"). `mth` stays textual
/// (the compact head), matching the wire format exactly; `path` and `ith`
/// are raw digests.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CanonicalProof<D: SupportedDigest> {
    pub a: u64,
    pub path: Vec<Hash<D>>,
    pub ith: Hash<D>,
    pub mth: String,
}
