//! Multi-provider sign-in verification
//!
//! [`FederatedVerifier`] holds one adapter per provider over a single shared
//! key set cache and looks up each provider's allowed audiences from
//! [`VerifierConfig`].

use super::{AppleVerifier, GoogleVerifier, Provider, VerifiedIdentity};
use crate::audit::AuditLogger;
use crate::clock::SystemClock;
use crate::config::VerifierConfig;
use crate::error::VerifyResult;
use crate::jwt::KeySetCache;
use std::sync::Arc;
use tracing::info;

/// Verifies identity tokens from any supported provider
#[derive(Debug, Clone)]
pub struct FederatedVerifier {
    google: GoogleVerifier,
    apple: AppleVerifier,
    config: VerifierConfig,
    cache: Arc<KeySetCache>,
}

impl FederatedVerifier {
    /// Build a verifier with its own key set cache
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn from_config(config: &VerifierConfig) -> VerifyResult<Self> {
        let cache = KeySetCache::with_options(
            config.http_timeout(),
            config.default_key_ttl(),
            Arc::new(SystemClock),
        )?;
        Ok(Self::with_cache(config, Arc::new(cache)))
    }

    /// Build a verifier over an existing key set cache
    pub fn with_cache(config: &VerifierConfig, cache: Arc<KeySetCache>) -> Self {
        let audit = AuditLogger::default().with_identifier_hashing(config.hash_audit_subjects);

        info!(
            google_audiences = config.google_audiences.len(),
            apple_audiences = config.apple_audiences.len(),
            email_policy = ?config.email_policy,
            "Sign-in verifier configured"
        );

        Self {
            google: GoogleVerifier::new(Arc::clone(&cache))
                .with_email_policy(config.email_policy)
                .with_audit_logger(audit.clone()),
            apple: AppleVerifier::new(Arc::clone(&cache))
                .with_email_policy(config.email_policy)
                .with_audit_logger(audit),
            config: config.clone(),
            cache,
        }
    }

    /// Verify a token issued by `provider`
    ///
    /// # Errors
    ///
    /// A provider with no configured audiences always yields a configuration
    /// error without any network access.
    pub async fn verify(&self, provider: Provider, token: &str) -> VerifyResult<VerifiedIdentity> {
        match provider {
            Provider::Google => {
                self.google
                    .verify(token, &self.config.google_audiences)
                    .await
            }
            Provider::Apple => self.apple.verify(token, &self.config.apple_audiences).await,
        }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Shared key set cache, for invalidation and stats
    pub fn cache(&self) -> &Arc<KeySetCache> {
        &self.cache
    }
}
