//! Schemas and canonical encoding (spec.md §4.E): the leaf-hash canonical
//! bytes, submission and interval records, the CBOR proof structure attached
//! to submissions, the compact head/stamp text formats, and the JSON head
//! record shape emitted to the broadcast sink.

mod canonical;
mod compact;
mod error;
mod records;
mod wire;

pub use canonical::{canonical_leaf_bytes, from_canonical_bytes, from_json, leaf_hash, to_canonical_bytes, to_json};
pub use compact::{format_compact_head, format_compact_stamp};
pub use error::SchemaError;
pub use records::{CanonicalProof, IntervalRecord, SubmissionRecord};
pub use wire::{
    consistency_to_json, inclusion_to_json, ConsistencyJson, HeadRecordJson, InclusionJson,
    IntervalHeadJson,
};
