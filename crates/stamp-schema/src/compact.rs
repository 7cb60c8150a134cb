use stamp_crypto::{b64url_encode, Hash, SupportedDigest};

use crate::canonical::to_canonical_bytes;
use crate::error::SchemaError;

/// `"<authority>/<interval>#v1:<b64url(mth)>"` (spec.md §4.E "Compact timestamp
/// token format").
pub fn format_compact_head<D: SupportedDigest>(authority: &str, interval: u64, mth: &Hash<D>) -> String {
    format!("{authority}/{interval}#v1:{}", b64url_encode(mth.bytes()))
}

/// `"<authority>/<interval>#v1,<timestamp>,<b64url(cbor([a, path]))>"`
/// (spec.md §4.E "Compact stamp format").
pub fn format_compact_stamp<D: SupportedDigest>(
    authority: &str,
    interval: u64,
    timestamp: &str,
    a: u64,
    path: &[Hash<D>],
) -> Result<String, SchemaError> {
    let cbor = to_canonical_bytes(&(a, path))?;
    Ok(format!(
        "{authority}/{interval}#v1,{timestamp},{}",
        b64url_encode(&cbor)
    ))
}
