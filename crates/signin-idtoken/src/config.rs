//! Verifier configuration
//!
//! Provider issuers and key endpoints are fixed; only the allowed audiences
//! (the application's client IDs) and operational knobs are configurable.
//! Loading these values from the environment is left to the caller.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the email claim is treated in the verified identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmailPolicy {
    /// Return the email whenever the token carries one
    #[default]
    AsAsserted,
    /// Return the email only when `email_verified` is true
    RequireVerified,
}

/// Identity token verifier configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Client IDs accepted as the `aud` of Google ID tokens
    pub google_audiences: Vec<String>,
    /// Service / bundle IDs accepted as the `aud` of Apple identity tokens
    pub apple_audiences: Vec<String>,
    /// Email claim handling
    pub email_policy: EmailPolicy,
    /// HTTP timeout for key endpoint requests
    pub http_timeout_secs: u64,
    /// Key set lifetime when the endpoint sends no max-age
    pub default_key_ttl_secs: u64,
    /// Hash subjects in audit records
    pub hash_audit_subjects: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            google_audiences: Vec::new(),
            apple_audiences: Vec::new(),
            email_policy: EmailPolicy::default(),
            http_timeout_secs: 10,
            default_key_ttl_secs: 3600,
            hash_audit_subjects: false,
        }
    }
}

impl VerifierConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn default_key_ttl(&self) -> Duration {
        Duration::from_secs(self.default_key_ttl_secs.max(1))
    }
}

/// Trim audience entries and drop blanks
pub(crate) fn normalize_audiences(audiences: &[String]) -> Vec<String> {
    audiences
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = VerifierConfig::default();
        assert!(config.google_audiences.is_empty());
        assert_eq!(config.email_policy, EmailPolicy::AsAsserted);
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
        assert_eq!(config.default_key_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_partial_deserialization() {
        let config: VerifierConfig = serde_json::from_value(json!({
            "google_audiences": ["web.apps.googleusercontent.com"],
            "email_policy": "require_verified"
        }))
        .unwrap();

        assert_eq!(config.google_audiences.len(), 1);
        assert!(config.apple_audiences.is_empty());
        assert_eq!(config.email_policy, EmailPolicy::RequireVerified);
        assert_eq!(config.http_timeout_secs, 10);
    }

    #[test]
    fn test_normalize_audiences() {
        let raw = vec![" a ".to_string(), "".to_string(), "   ".to_string(), "b".to_string()];
        assert_eq!(normalize_audiences(&raw), vec!["a", "b"]);
    }
}
