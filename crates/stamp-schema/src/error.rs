use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("canonical CBOR encode failed: {0}")]
    CborEncode(String),
    #[error("canonical CBOR decode failed: {0}")]
    CborDecode(String),
    #[error("JSON (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid digest: {0}")]
    InvalidDigest(String),
}
