//! Signature verification
//!
//! The header algorithm must be exactly the provider-mandated algorithm. There
//! is no negotiation and no `none` fallback. The key must belong to the matching
//! key family, and the signature is checked over the signing input bytes kept by
//! [`ParsedToken`]. This is the only place token authenticity is established.

use super::codec;
use super::jwks::{KeyMaterial, KeyRecord};
use super::token::ParsedToken;
use crate::error::{VerifyError, VerifyResult};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey};
use std::str::FromStr;
use tracing::{debug, warn};

/// Key family required by an algorithm
fn key_family(algorithm: Algorithm) -> Option<&'static str> {
    match algorithm {
        Algorithm::RS256 => Some("RSA"),
        _ => None,
    }
}

/// Parse a header `alg` and require it to equal the mandated algorithm
///
/// # Errors
///
/// Returns [`VerifyError::UnsupportedAlgorithm`] for a missing, unknown or
/// different algorithm.
pub fn require_algorithm(alg: Option<&str>, mandated: Algorithm) -> VerifyResult<Algorithm> {
    let alg = alg.ok_or_else(|| VerifyError::UnsupportedAlgorithm("missing".to_string()))?;

    match Algorithm::from_str(alg) {
        Ok(parsed) if parsed == mandated => Ok(parsed),
        _ => {
            warn!(algorithm = alg, mandated = ?mandated, "Token algorithm rejected");
            Err(VerifyError::UnsupportedAlgorithm(alg.to_string()))
        }
    }
}

/// Verify a parsed token's signature with a resolved key
///
/// # Errors
///
/// Returns a cryptographic error if the algorithm is not the mandated one, the
/// key does not fit the algorithm, or the signature does not match. Returns a
/// key-resolution error if the key's own fields cannot be decoded.
pub fn verify_signature(
    token: &ParsedToken,
    key: &KeyRecord,
    mandated: Algorithm,
) -> VerifyResult<()> {
    let algorithm = require_algorithm(token.header().alg.as_deref(), mandated)?;
    let kid = key.kid.as_deref().unwrap_or("<none>");

    let expected_family = key_family(algorithm)
        .ok_or_else(|| VerifyError::UnsupportedAlgorithm(format!("{algorithm:?}")))?;

    let (n, e) = match &key.material {
        KeyMaterial::Rsa { n, e } => (n, e),
        other => {
            warn!(key_id = kid, key_type = other.key_type(), "Key type does not match algorithm");
            return Err(VerifyError::KeyTypeMismatch {
                expected: expected_family.to_string(),
                found: other.key_type().to_string(),
            });
        }
    };

    if let Some(key_use) = key.key_use.as_deref()
        && key_use != "sig"
    {
        return Err(VerifyError::KeyUsageMismatch {
            expected: format!("{algorithm:?}"),
            reason: format!("key use is {key_use}"),
        });
    }

    if let Some(key_alg) = key.alg.as_deref()
        && Algorithm::from_str(key_alg).ok() != Some(algorithm)
    {
        return Err(VerifyError::KeyUsageMismatch {
            expected: format!("{algorithm:?}"),
            reason: format!("key algorithm is {key_alg}"),
        });
    }

    let modulus = decode_component(kid, "n", n)?;
    let exponent = decode_component(kid, "e", e)?;

    let decoding_key = DecodingKey::from_rsa_raw_components(
        strip_leading_zeros(&modulus),
        strip_leading_zeros(&exponent),
    );

    // Canonical re-encoding of the bytes the decomposer already decoded
    let signature = URL_SAFE_NO_PAD.encode(token.signature());

    match jsonwebtoken::crypto::verify(&signature, token.signing_input(), &decoding_key, algorithm) {
        Ok(true) => {}
        Ok(false) => {
            warn!(key_id = kid, "Token signature verification failed");
            return Err(VerifyError::InvalidSignature);
        }
        Err(e) => {
            warn!(key_id = kid, error = %e, "Token signature could not be checked");
            return Err(VerifyError::InvalidSignature);
        }
    }

    debug!(key_id = kid, algorithm = ?algorithm, "Token signature verified");
    Ok(())
}

fn decode_component(kid: &str, name: &str, value: &str) -> VerifyResult<Vec<u8>> {
    let bytes = codec::decode(value).map_err(|e| VerifyError::InvalidKeyMaterial {
        kid: kid.to_string(),
        reason: format!("{name}: {e}"),
    })?;
    if bytes.iter().all(|&b| b == 0) {
        return Err(VerifyError::InvalidKeyMaterial {
            kid: kid.to_string(),
            reason: format!("{name}: empty"),
        });
    }
    Ok(bytes)
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
