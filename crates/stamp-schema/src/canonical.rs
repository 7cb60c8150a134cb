use serde::{de::DeserializeOwned, Deserialize, Serialize};
use stamp_crypto::{Hash, SupportedDigest};

use crate::error::SchemaError;

/// The canonical binary encoding (spec.md §4.E): struct field order is
/// fixed by the type definition, so there is no key-ordering ambiguity to
/// resolve the way a map-typed schema would need; CBOR gives us the rest
/// (definite-length items, no indefinite strings).
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SchemaError> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf).map_err(|e| SchemaError::CborEncode(e.to_string()))?;
    Ok(buf)
}

pub fn from_canonical_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SchemaError> {
    ciborium::de::from_reader(bytes).map_err(|e| SchemaError::CborDecode(e.to_string()))
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String, SchemaError> {
    Ok(serde_json::to_string(value)?)
}

pub fn from_json<T: DeserializeOwned>(s: &str) -> Result<T, SchemaError> {
    Ok(serde_json::from_str(s)?)
}

/// The fields hashed for a submission's leaf hash (spec.md §3 "Leaf
/// datum"): `H_leaf(s) = H(0x00 || canonical_encoding({data, timestamp, typ,
/// version}))`. This struct produces exactly the inner canonical bytes;
/// `stamp_crypto::from_leaf` applies the `0x00` prefix.
#[derive(Serialize, Deserialize)]
struct LeafDatumEncoding<'a> {
    data: &'a [u8],
    timestamp: &'a str,
    typ: &'a str,
    version: &'a str,
}

pub fn canonical_leaf_bytes(data: &[u8], timestamp: &str) -> Result<Vec<u8>, SchemaError> {
    to_canonical_bytes(&LeafDatumEncoding {
        data,
        timestamp,
        typ: "ts",
        version: "1",
    })
}

/// `H_leaf(s)`, the content hash of a submission independent of its eventual
/// position in an interval tree.
pub fn leaf_hash<D: SupportedDigest>(data: &[u8], timestamp: &str) -> Result<Hash<D>, SchemaError> {
    let bytes = canonical_leaf_bytes(data, timestamp)?;
    Ok(stamp_crypto::from_leaf::<D>(0, &bytes).value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Sha512;

    #[test]
    fn leaf_hash_is_independent_of_eventual_position() {
        let h: Hash<Sha512> = leaf_hash(b"payload", "2026-07-30T00:00:00.000000Z").unwrap();
        let bytes = canonical_leaf_bytes(b"payload", "2026-07-30T00:00:00.000000Z").unwrap();
        let via_from_leaf_at_other_index = stamp_crypto::from_leaf::<Sha512>(41, &bytes).value;
        assert_eq!(h, via_from_leaf_at_other_index);
    }

    #[test]
    fn json_round_trips() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Thing {
            a: u64,
            b: String,
        }
        let t = Thing {
            a: 7,
            b: "hi".into(),
        };
        let s = to_json(&t).unwrap();
        let back: Thing = from_json(&s).unwrap();
        assert_eq!(t, back);
    }

    #[test]
    fn cbor_round_trips() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Thing {
            a: u64,
            b: String,
        }
        let t = Thing {
            a: 7,
            b: "hi".into(),
        };
        let bytes = to_canonical_bytes(&t).unwrap();
        let back: Thing = from_canonical_bytes(&bytes).unwrap();
        assert_eq!(t, back);
    }
}
