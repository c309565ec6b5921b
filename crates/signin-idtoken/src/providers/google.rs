//! Google ID token verification

use super::{IdTokenVerifier, ProviderProfile, VerifiedIdentity};
use crate::audit::AuditLogger;
use crate::config::EmailPolicy;
use crate::error::VerifyResult;
use crate::jwt::KeySetCache;
use std::sync::Arc;

/// Verifies Google ID tokens
///
/// Accepts `iss` of either `accounts.google.com` or
/// `https://accounts.google.com`; keys come from Google's published key set.
///
/// # Example
///
/// ```no_run
/// use signin_idtoken::{GoogleVerifier, KeySetCache};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let verifier = GoogleVerifier::new(Arc::new(KeySetCache::new()?));
/// let allowed = vec!["1234.apps.googleusercontent.com".to_string()];
/// let identity = verifier.verify("eyJ...", &allowed).await?;
/// println!("signed in as {}", identity.subject());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GoogleVerifier {
    inner: IdTokenVerifier,
}

impl GoogleVerifier {
    pub fn new(cache: Arc<KeySetCache>) -> Self {
        Self {
            inner: IdTokenVerifier::new(ProviderProfile::google(), cache),
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

    /// Verify a Google ID token against the application's client IDs
    pub async fn verify(
        &self,
        token: &str,
        allowed_audiences: &[String],
    ) -> VerifyResult<VerifiedIdentity> {
        self.inner.verify(token, allowed_audiences).await
    }
}
