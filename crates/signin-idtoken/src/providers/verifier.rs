//! Provider-agnostic identity token verification
//!
//! [`IdTokenVerifier`] runs one verification attempt as a straight pipeline:
//!
//! ```text
//! Decompose → FetchOrUseCachedKeys → LookupKey (refresh once) → VerifySignature → ValidateClaims
//! ```
//!
//! Any stage failing ends the attempt with that stage's error. Nothing is
//! retried except the single key-set refresh on an unknown key id.

use super::{ProviderProfile, VerifiedIdentity};
use crate::audit::{AuditLogger, VerificationEvent};
use crate::config::{EmailPolicy, normalize_audiences};
use crate::error::{VerifyError, VerifyResult};
use crate::jwt::{
    KeySetCache, ParsedToken, TokenClaims, ValidatedClaims, signature, validate_claims,
};
use std::sync::Arc;
use tracing::debug;

/// Identity token verifier for one provider profile
#[derive(Debug, Clone)]
pub struct IdTokenVerifier {
    /// Fixed trust parameters
    profile: ProviderProfile,
    /// Shared key set cache
    cache: Arc<KeySetCache>,
    /// Email claim handling
    email_policy: EmailPolicy,
    /// Outcome logging
    audit: AuditLogger,
}

impl IdTokenVerifier {
    /// Create a verifier for a profile, sharing the given key set cache
    pub fn new(profile: ProviderProfile, cache: Arc<KeySetCache>) -> Self {
        Self {
            profile,
            cache,
            email_policy: EmailPolicy::default(),
            audit: AuditLogger::default(),
        }
    }

    /// Set the email claim policy
    pub fn with_email_policy(mut self, policy: EmailPolicy) -> Self {
        self.email_policy = policy;
        self
    }

    /// Set the audit logger
    pub fn with_audit_logger(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    pub fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    /// Verify a compact identity token
    ///
    /// `allowed_audiences` lists the client IDs this application accepts. An
    /// empty list (after dropping blank entries) fails immediately, before the
    /// token is parsed or any key material is fetched.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage's [`VerifyError`]. Every outcome is
    /// recorded through the audit logger.
    pub async fn verify(
        &self,
        token: &str,
        allowed_audiences: &[String],
    ) -> VerifyResult<VerifiedIdentity> {
        let result = self.run(token, allowed_audiences).await;

        let event = match &result {
            Ok(identity) => VerificationEvent::verified(self.profile.provider, identity.subject()),
            Err(e) => VerificationEvent::rejected(self.profile.provider, e),
        };
        self.audit.log(&event);

        result
    }

    async fn run(&self, token: &str, allowed_audiences: &[String]) -> VerifyResult<VerifiedIdentity> {
        let allowed = normalize_audiences(allowed_audiences);
        if allowed.is_empty() {
            return Err(VerifyError::NoAllowedAudiences {
                provider: self.profile.provider.to_string(),
            });
        }

        let parsed = ParsedToken::parse(token)?;

        // Reject foreign algorithms before spending a network round trip
        signature::require_algorithm(parsed.header().alg.as_deref(), self.profile.algorithm)?;

        let kid = parsed
            .header()
            .kid
            .as_deref()
            .filter(|kid| !kid.is_empty())
            .ok_or(VerifyError::MissingKeyId)?;

        let key = self.cache.resolve(&self.profile.jwks_uri, kid).await?;
        signature::verify_signature(&parsed, &key, self.profile.algorithm)?;

        let now = self.cache.clock().now_secs();
        let validated = validate_claims(parsed.claims(), self.profile.issuers, &allowed, now)?;

        debug!(
            provider = %self.profile.provider,
            issuer = %validated.issuer,
            key_id = kid,
            "Identity token checks passed"
        );

        Ok(self.identity(validated, parsed.into_claims()))
    }

    /// Map validated claims to the outward identity
    fn identity(&self, validated: ValidatedClaims, claims: TokenClaims) -> VerifiedIdentity {
        let email_verified = claims.email_verified.unwrap_or(false);

        let email = claims
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .filter(|_| match self.email_policy {
                EmailPolicy::AsAsserted => true,
                EmailPolicy::RequireVerified => email_verified,
            });

        let display_name = claims
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from);

        VerifiedIdentity::new(
            self.profile.provider,
            validated.subject,
            email,
            email_verified,
            display_name,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::Audience;
    use crate::providers::Provider;
    use jsonwebtoken::Algorithm;

    fn verifier(policy: EmailPolicy) -> IdTokenVerifier {
        let profile = ProviderProfile {
            provider: Provider::Google,
            issuers: &["https://issuer.test"],
            jwks_uri: "https://issuer.test/jwks".to_string(),
            algorithm: Algorithm::RS256,
        };
        IdTokenVerifier::new(profile, Arc::new(KeySetCache::new().unwrap()))
            .with_email_policy(policy)
    }

    fn validated() -> ValidatedClaims {
        ValidatedClaims {
            subject: "1234".into(),
            issuer: "https://issuer.test".into(),
            expires_at: 0,
        }
    }

    fn claims(email: Option<&str>, verified: Option<bool>, name: Option<&str>) -> TokenClaims {
        TokenClaims {
            aud: Some(Audience::Single("a".into())),
            email: email.map(String::from),
            email_verified: verified,
            name: name.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_identity_normalization() {
        let identity = verifier(EmailPolicy::AsAsserted).identity(
            validated(),
            claims(Some("  Alice@Example.COM "), Some(true), Some("  Alice  ")),
        );
        assert_eq!(identity.subject(), "1234");
        assert_eq!(identity.email(), Some("alice@example.com"));
        assert!(identity.email_verified());
        assert_eq!(identity.display_name(), Some("Alice"));
        assert_eq!(identity.provider(), Provider::Google);
    }

    #[test]
    fn test_blank_optional_fields_are_absent() {
        let identity =
            verifier(EmailPolicy::AsAsserted).identity(validated(), claims(Some("   "), None, Some("")));
        assert_eq!(identity.email(), None);
        assert_eq!(identity.display_name(), None);
        assert!(!identity.email_verified());
    }

    #[test]
    fn test_email_policy() {
        let unverified = claims(Some("bob@example.com"), Some(false), None);

        let as_asserted = verifier(EmailPolicy::AsAsserted).identity(validated(), unverified.clone());
        assert_eq!(as_asserted.email(), Some("bob@example.com"));

        let strict = verifier(EmailPolicy::RequireVerified).identity(validated(), unverified);
        assert_eq!(strict.email(), None);

        let verified = claims(Some("bob@example.com"), Some(true), None);
        let strict = verifier(EmailPolicy::RequireVerified).identity(validated(), verified);
        assert_eq!(strict.email(), Some("bob@example.com"));
    }

    #[tokio::test]
    async fn test_empty_audiences_fail_before_parsing() {
        let err = verifier(EmailPolicy::AsAsserted)
            .verify("not-a-token", &[])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            VerifyError::NoAllowedAudiences {
                provider: "google".into()
            }
        );

        let err = verifier(EmailPolicy::AsAsserted)
            .verify("not-a-token", &["  ".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::NoAllowedAudiences { .. }));
    }

    #[tokio::test]
    async fn test_malformed_token_fails_before_fetch() {
        let v = verifier(EmailPolicy::AsAsserted);
        let err = v.verify("a.b", &["client".to_string()]).await.unwrap_err();
        assert_eq!(err, VerifyError::MalformedToken { segments: 2 });
        assert!(v.cache.is_empty());
    }
}
