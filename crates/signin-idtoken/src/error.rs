//! Verification error types
//!
//! Every fallible step of a verification attempt (decode, fetch, verify,
//! validate) reports a [`VerifyError`]. Callers that only need the coarse
//! classification use [`VerifyError::kind`]; audit logging uses
//! [`VerifyError::is_integrity_failure`] to separate tampering signals from
//! ordinary rejections.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerifyError>;

/// Coarse failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Wrong segment count, undecodable base64url or JSON
    Malformed,
    /// Deployment misconfiguration (e.g. no allowed audiences)
    Configuration,
    /// Trust could not be established: key endpoint unusable or key id unknown
    KeyResolution,
    /// Unsupported algorithm, key-type mismatch or signature mismatch
    Cryptographic,
    /// Issuer, audience, expiry or subject rejected
    Claim,
}

impl ErrorKind {
    /// Stable lowercase name for log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Malformed => "malformed",
            ErrorKind::Configuration => "configuration",
            ErrorKind::KeyResolution => "key_resolution",
            ErrorKind::Cryptographic => "cryptographic",
            ErrorKind::Claim => "claim",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity token verification errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("malformed token: expected 3 segments, found {segments}")]
    MalformedToken { segments: usize },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("invalid signature encoding")]
    InvalidSignatureEncoding,

    #[error("configuration error: no allowed audiences configured for {provider}")]
    NoAllowedAudiences { provider: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("key material fetch failed for {endpoint}: {reason}")]
    KeyFetch { endpoint: String, reason: String },

    #[error("no keys found at {endpoint}")]
    NoKeysFound { endpoint: String },

    #[error("missing key id in token header")]
    MissingKeyId,

    #[error("key id not found in key material: {kid}")]
    KeyNotFound { kid: String },

    #[error("invalid key material for key id {kid}: {reason}")]
    InvalidKeyMaterial { kid: String, reason: String },

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("key type mismatch: expected {expected}, found {found}")]
    KeyTypeMismatch { expected: String, found: String },

    #[error("key not usable for {expected}: {reason}")]
    KeyUsageMismatch { expected: String, reason: String },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("issuer mismatch: {found}")]
    IssuerMismatch { found: String },

    #[error("missing audience claim")]
    MissingAudience,

    #[error("audience mismatch")]
    AudienceMismatch,

    #[error("missing expiry claim")]
    MissingExpiry,

    #[error("token expired at {exp} (now {now})")]
    TokenExpired { exp: i64, now: i64 },

    #[error("missing subject claim")]
    MissingSubject,
}

impl VerifyError {
    /// Classify this error per the failure taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerifyError::MalformedToken { .. }
            | VerifyError::InvalidHeader(_)
            | VerifyError::InvalidPayload(_)
            | VerifyError::InvalidSignatureEncoding => ErrorKind::Malformed,
            VerifyError::NoAllowedAudiences { .. } | VerifyError::Configuration(_) => {
                ErrorKind::Configuration
            }
            VerifyError::KeyFetch { .. }
            | VerifyError::NoKeysFound { .. }
            | VerifyError::MissingKeyId
            | VerifyError::KeyNotFound { .. }
            | VerifyError::InvalidKeyMaterial { .. } => ErrorKind::KeyResolution,
            VerifyError::UnsupportedAlgorithm(_)
            | VerifyError::KeyTypeMismatch { .. }
            | VerifyError::KeyUsageMismatch { .. }
            | VerifyError::InvalidSignature => ErrorKind::Cryptographic,
            VerifyError::IssuerMismatch { .. }
            | VerifyError::MissingAudience
            | VerifyError::AudienceMismatch
            | VerifyError::MissingExpiry
            | VerifyError::TokenExpired { .. }
            | VerifyError::MissingSubject => ErrorKind::Claim,
        }
    }

    /// Check if this failure points at tampering or spoofing
    pub fn is_integrity_failure(&self) -> bool {
        self.kind() == ErrorKind::Cryptographic
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            VerifyError::MalformedToken { .. } => "malformed_token",
            VerifyError::InvalidHeader(_) => "invalid_header",
            VerifyError::InvalidPayload(_) => "invalid_payload",
            VerifyError::InvalidSignatureEncoding => "invalid_signature_encoding",
            VerifyError::NoAllowedAudiences { .. } => "no_allowed_audiences",
            VerifyError::Configuration(_) => "configuration",
            VerifyError::KeyFetch { .. } => "key_fetch",
            VerifyError::NoKeysFound { .. } => "no_keys_found",
            VerifyError::MissingKeyId => "missing_key_id",
            VerifyError::KeyNotFound { .. } => "key_not_found",
            VerifyError::InvalidKeyMaterial { .. } => "invalid_key_material",
            VerifyError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            VerifyError::KeyTypeMismatch { .. } => "key_type_mismatch",
            VerifyError::KeyUsageMismatch { .. } => "key_usage_mismatch",
            VerifyError::InvalidSignature => "invalid_signature",
            VerifyError::IssuerMismatch { .. } => "issuer_mismatch",
            VerifyError::MissingAudience => "missing_audience",
            VerifyError::AudienceMismatch => "audience_mismatch",
            VerifyError::MissingExpiry => "missing_expiry",
            VerifyError::TokenExpired { .. } => "token_expired",
            VerifyError::MissingSubject => "missing_subject",
        }
    }

    pub(crate) fn key_fetch(endpoint: &str, reason: impl Into<String>) -> Self {
        VerifyError::KeyFetch {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }
}
