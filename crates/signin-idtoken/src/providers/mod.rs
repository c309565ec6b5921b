//! Identity providers
//!
//! Each adapter pins a provider's issuers, key endpoint and signing algorithm,
//! and runs a token through decompose → key lookup → signature → claims before
//! producing a [`VerifiedIdentity`].
//!
//! - [`GoogleVerifier`] - Google ID tokens
//! - [`AppleVerifier`] - Sign in with Apple identity tokens
//! - [`FederatedVerifier`] - both, with audiences taken from [`VerifierConfig`](crate::VerifierConfig)

pub mod apple;
pub mod federated;
pub mod google;
pub mod verifier;

pub use apple::AppleVerifier;
pub use federated::FederatedVerifier;
pub use google::GoogleVerifier;
pub use verifier::IdTokenVerifier;

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Supported identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Apple,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Apple => "apple",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider name not recognized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown identity provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "apple" => Ok(Provider::Apple),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

/// Fixed trust parameters for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// Provider these parameters belong to
    pub provider: Provider,
    /// Accepted `iss` values, compared exactly
    pub issuers: &'static [&'static str],
    /// Key set endpoint
    pub jwks_uri: String,
    /// The only accepted signing algorithm
    pub algorithm: Algorithm,
}

/// Issuer values Google places in ID tokens
pub const GOOGLE_ISSUERS: &[&str] = &["accounts.google.com", "https://accounts.google.com"];

/// Google's published signing keys
pub const GOOGLE_JWKS_URI: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Issuer value Apple places in identity tokens
pub const APPLE_ISSUERS: &[&str] = &["https://appleid.apple.com"];

/// Apple's published signing keys
pub const APPLE_JWKS_URI: &str = "https://appleid.apple.com/auth/keys";

impl ProviderProfile {
    /// Google ID tokens: RS256, either issuer spelling
    pub fn google() -> Self {
        Self {
            provider: Provider::Google,
            issuers: GOOGLE_ISSUERS,
            jwks_uri: GOOGLE_JWKS_URI.to_string(),
            algorithm: Algorithm::RS256,
        }
    }

    /// Sign in with Apple identity tokens: RS256
    pub fn apple() -> Self {
        Self {
            provider: Provider::Apple,
            issuers: APPLE_ISSUERS,
            jwks_uri: APPLE_JWKS_URI.to_string(),
            algorithm: Algorithm::RS256,
        }
    }

    /// Fixed profile for a provider
    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::Google => Self::google(),
            Provider::Apple => Self::apple(),
        }
    }

    /// Same trust parameters with a different key endpoint
    ///
    /// Endpoint rules still apply at fetch time: https, or plain http to a
    /// loopback host.
    pub fn with_jwks_uri(mut self, jwks_uri: impl Into<String>) -> Self {
        self.jwks_uri = jwks_uri.into();
        self
    }
}

/// Identity established from a verified token
///
/// Only constructed by the verification pipeline, after the signature, issuer,
/// audience and expiry checks have all passed. Fields are read through
/// accessors; the type serializes for hand-off but never deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedIdentity {
    provider: Provider,
    subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
}

impl VerifiedIdentity {
    pub(crate) fn new(
        provider: Provider,
        subject: String,
        email: Option<String>,
        email_verified: bool,
        display_name: Option<String>,
    ) -> Self {
        Self {
            provider,
            subject,
            email,
            email_verified,
            display_name,
        }
    }

    /// Provider that issued the token
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Provider-scoped stable subject identifier
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Email, trimmed and lower-cased
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Whether the provider asserted the email as verified
    pub fn email_verified(&self) -> bool {
        self.email_verified
    }

    /// Display name, trimmed
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}
