//! Sign in with Apple identity token verification
//!
//! Apple sends `email_verified` as the strings `"true"` / `"false"` rather
//! than JSON booleans; claim decoding accepts both encodings.

use super::{IdTokenVerifier, ProviderProfile, VerifiedIdentity};
use crate::audit::AuditLogger;
use crate::config::EmailPolicy;
use crate::error::VerifyResult;
use crate::jwt::KeySetCache;
use std::sync::Arc;

/// Verifies Sign in with Apple identity tokens
///
/// The allowed audiences are the app's bundle ID and/or Services ID.
#[derive(Debug, Clone)]
pub struct AppleVerifier {
    inner: IdTokenVerifier,
}

impl AppleVerifier {
    pub fn new(cache: Arc<KeySetCache>) -> Self {
        Self {
            inner: IdTokenVerifier::new(ProviderProfile::apple(), cache),
        }
    }

    pub fn with_email_policy(mut self, policy: EmailPolicy) -> Self {
        self.inner = self.inner.with_email_policy(policy);
        self
    }

    pub fn with_audit_logger(mut self, audit: AuditLogger) -> Self {
        self.inner = self.inner.with_audit_logger(audit);
        self
    }

    /// Verify an Apple identity token against the application's client IDs
    pub async fn verify(
        &self,
        token: &str,
        allowed_audiences: &[String],
    ) -> VerifyResult<VerifiedIdentity> {
        self.inner.verify(token, allowed_audiences).await
    }
}
