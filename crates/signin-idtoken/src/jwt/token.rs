//! Compact token decomposition
//!
//! Splits a compact JWS into its three segments and decodes the header and
//! claims into typed records. All "is this a string / number" narrowing happens
//! here, once; downstream validation works on typed optional fields.
//!
//! The signing input kept on [`ParsedToken`] is the original
//! `header.claims` text exactly as received. Re-encoding the decoded JSON would
//! not reproduce the signed bytes.

use super::codec;
use crate::error::{VerifyError, VerifyResult};
use serde::{Deserialize, Deserializer, Serialize};

/// JOSE header fields used during verification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Signing algorithm (alg)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Key ID (kid)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Token type (typ)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// Audience claim: a single value or a list of values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    /// Normalize to a list of audience values
    pub fn values(&self) -> Vec<&str> {
        match self {
            Audience::Single(aud) => vec![aud.as_str()],
            Audience::Many(auds) => auds.iter().map(String::as_str).collect(),
        }
    }
}

/// Identity token claims. Nothing here is trusted until validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer (iss)
    #[serde(default)]
    pub iss: Option<String>,

    /// Subject (sub)
    #[serde(default)]
    pub sub: Option<String>,

    /// Audience (aud)
    #[serde(default)]
    pub aud: Option<Audience>,

    /// Expiration time (exp), seconds since epoch
    #[serde(default, deserialize_with = "deserialize_numeric_date")]
    pub exp: Option<i64>,

    /// Issued at (iat), seconds since epoch
    #[serde(default, deserialize_with = "deserialize_numeric_date")]
    pub iat: Option<i64>,

    /// Email address
    #[serde(default)]
    pub email: Option<String>,

    /// Whether the provider verified the email address
    #[serde(default, deserialize_with = "deserialize_flexible_bool")]
    pub email_verified: Option<bool>,

    /// Display name
    #[serde(default)]
    pub name: Option<String>,
}

/// NumericDate as an integer or a float (truncated toward zero)
fn deserialize_numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Option::<serde_json::Number>::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(i))
            } else if let Some(f) = n.as_f64()
                && f.is_finite()
                && f.abs() < i64::MAX as f64
            {
                Ok(Some(f.trunc() as i64))
            } else {
                Err(D::Error::custom(format!("numeric date out of range: {n}")))
            }
        }
    }
}

/// Boolean that may also arrive as the string "true" / "false"
fn deserialize_flexible_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolOrString::Bool(b)) => Ok(Some(b)),
        Some(BoolOrString::String(s)) => match s.as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            other => Err(D::Error::custom(format!("expected boolean, found {other:?}"))),
        },
    }
}

/// A decomposed compact token, valid for one verification attempt
#[derive(Debug, Clone)]
pub struct ParsedToken {
    header: TokenHeader,
    claims: TokenClaims,
    signing_input: Vec<u8>,
    signature: Vec<u8>,
}

impl ParsedToken {
    /// Decompose a compact token string
    ///
    /// # Errors
    ///
    /// Returns a malformed-input error if the token does not have exactly three
    /// non-empty segments, or if any segment fails to decode.
    pub fn parse(token: &str) -> VerifyResult<Self> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(VerifyError::MalformedToken {
                segments: segments.len(),
            });
        }
        let (header_b64, claims_b64, signature_b64) = (segments[0], segments[1], segments[2]);

        if header_b64.is_empty() {
            return Err(VerifyError::InvalidHeader("empty segment".to_string()));
        }
        if claims_b64.is_empty() {
            return Err(VerifyError::InvalidPayload("empty segment".to_string()));
        }
        if signature_b64.is_empty() {
            return Err(VerifyError::InvalidSignatureEncoding);
        }

        let header: TokenHeader =
            codec::decode_json(header_b64).map_err(|e| VerifyError::InvalidHeader(e.to_string()))?;

        let claims: TokenClaims = codec::decode_json(claims_b64)
            .map_err(|e| VerifyError::InvalidPayload(e.to_string()))?;

        let signature =
            codec::decode(signature_b64).map_err(|_| VerifyError::InvalidSignatureEncoding)?;

        let signing_input = token[..header_b64.len() + 1 + claims_b64.len()]
            .as_bytes()
            .to_vec();

        Ok(Self {
            header,
            claims,
            signing_input,
            signature,
        })
    }

    pub fn header(&self) -> &TokenHeader {
        &self.header
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// The `header.claims` bytes exactly as received
    pub fn signing_input(&self) -> &[u8] {
        &self.signing_input
    }

    /// Raw signature bytes
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Consume the token, keeping only its claims
    pub fn into_claims(self) -> TokenClaims {
        self.claims
    }
}
