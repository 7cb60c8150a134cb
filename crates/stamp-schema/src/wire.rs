use serde::{Deserialize, Serialize};
use stamp_crypto::{b64url_encode, SupportedDigest};
use stamp_merkle::{ConsistencyProof, InclusionProof};

/// The textual structured encoding (spec.md §4.E): digests as unpadded
/// URL-safe base64 strings, for human APIs. This mirrors the emitted head
/// record JSON shape of spec.md §6 exactly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntervalHeadJson {
    pub index: u64,
    pub timestamp: String,
    pub ith: String,
    pub version: String,
    pub typ: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InclusionJson {
    pub head: u64,
    pub leaf: Option<u64>,
    pub a: u64,
    pub nodes: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsistencyJson {
    pub old_interval: u64,
    pub new_interval: u64,
    pub nodes: Vec<String>,
    pub version: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeadRecordJson {
    pub version: String,
    pub authority: String,
    pub interval: IntervalHeadJson,
    pub mth: String,
    pub inclusion: InclusionJson,
    /// `None` when `k < 2` (spec.md §6).
    pub consistency: Option<ConsistencyJson>,
}

pub fn inclusion_to_json<D: SupportedDigest>(head: u64, proof: &InclusionProof<D>) -> InclusionJson {
    InclusionJson {
        head,
        leaf: None,
        a: proof.leaf_index,
        nodes: proof.neighbours.iter().map(|h| b64url_encode(h.bytes())).collect(),
    }
}

pub fn consistency_to_json<D: SupportedDigest>(
    old_interval: u64,
    new_interval: u64,
    proof: &ConsistencyProof<D>,
) -> ConsistencyJson {
    ConsistencyJson {
        old_interval,
        new_interval,
        nodes: proof.nodes.iter().map(|h| b64url_encode(h.bytes())).collect(),
        version: "1".to_string(),
    }
}
