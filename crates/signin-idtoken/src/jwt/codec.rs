//! Base64URL decoding for compact token segments and JWK fields
//!
//! Segments arrive unpadded and in the URL-safe alphabet. Decoding maps the
//! alphabet back to standard base64 and restores padding before handing the
//! input to the standard engine, so padded and unpadded inputs both decode.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::de::DeserializeOwned;

/// Base64URL decode failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Input is not valid base64url
    #[error("invalid base64url: {0}")]
    Base64(String),
    /// Decoded bytes are not the expected JSON document
    #[error("invalid JSON: {0}")]
    Json(String),
}

/// Decode a base64url segment into raw bytes
pub fn decode(input: &str) -> Result<Vec<u8>, CodecError> {
    let mut standard: String = input
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let remainder = standard.len() % 4;
    if remainder != 0 {
        standard.extend(std::iter::repeat_n('=', 4 - remainder));
    }

    STANDARD
        .decode(standard.as_bytes())
        .map_err(|e| CodecError::Base64(e.to_string()))
}

/// Decode a base64url segment and parse it as JSON
pub fn decode_json<T: DeserializeOwned>(input: &str) -> Result<T, CodecError> {
    let bytes = decode(input)?;
    serde_json::from_slice(&bytes).map_err(|e| CodecError::Json(e.to_string()))
}
