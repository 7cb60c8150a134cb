//! Unpadded URL-safe base64, the textual digest encoding spec.md §4.E and §6
//! use throughout compact heads, stamps, and JSON head records.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

pub fn b64url_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn b64url_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_and_has_no_padding() {
        let encoded = b64url_encode(b"hello transparency log");
        assert!(!encoded.contains('='));
        assert_eq!(b64url_decode(&encoded).unwrap(), b"hello transparency log");
    }
}
