//! Claims validation
//!
//! Checks run in a fixed order so the first failure is the most useful one to
//! log: issuer, audience, expiry, subject. Issuer and audience comparisons are
//! exact string equality. Expiry has no leeway; a token whose `exp` equals the
//! current second is already expired.

use super::token::TokenClaims;
use crate::error::{VerifyError, VerifyResult};
use tracing::debug;

/// Claims that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedClaims {
    /// Subject, trimmed and non-empty
    pub subject: String,
    /// Issuer that matched the allow-list
    pub issuer: String,
    /// Expiry, seconds since epoch
    pub expires_at: i64,
}

/// Validate claims against fixed issuers and caller-supplied audiences
///
/// # Errors
///
/// Returns the first failing check as a claim error. An empty
/// `allowed_audiences` slice is a configuration error and never matches.
pub fn validate_claims(
    claims: &TokenClaims,
    expected_issuers: &[&str],
    allowed_audiences: &[String],
    now: u64,
) -> VerifyResult<ValidatedClaims> {
    if allowed_audiences.is_empty() {
        return Err(VerifyError::Configuration(
            "allowed audience list is empty".to_string(),
        ));
    }

    let issuer = claims.iss.as_deref().unwrap_or_default();
    if !expected_issuers.contains(&issuer) {
        debug!(issuer = issuer, "Token issuer not in allow-list");
        return Err(VerifyError::IssuerMismatch {
            found: issuer.to_string(),
        });
    }

    let audiences = claims.aud.as_ref().map(|a| a.values()).unwrap_or_default();
    if audiences.is_empty() {
        return Err(VerifyError::MissingAudience);
    }
    if !audiences
        .iter()
        .any(|aud| allowed_audiences.iter().any(|allowed| allowed.as_str() == *aud))
    {
        debug!(audiences = ?audiences, "Token audience not in allow-list");
        return Err(VerifyError::AudienceMismatch);
    }

    let exp = claims.exp.ok_or(VerifyError::MissingExpiry)?;
    let now = i64::try_from(now).unwrap_or(i64::MAX);
    if exp <= now {
        debug!(exp = exp, now = now, "Token expired");
        return Err(VerifyError::TokenExpired { exp, now });
    }

    let subject = claims
        .sub
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(VerifyError::MissingSubject)?;

    Ok(ValidatedClaims {
        subject: subject.to_string(),
        issuer: issuer.to_string(),
        expires_at: exp,
    })
}
