//! Structured audit logging for sign-in verification
//!
//! One record per verification attempt, emitted through `tracing` under the
//! `audit::signin` target:
//!
//! - [`VerificationEvent::Verified`] at `info`
//! - claim rejections (expiry, audience, issuer) at `info`; these are
//!   expected, e.g. a client replaying an old token
//! - cryptographic failures at `warn` with `integrity_failure = true`; these
//!   indicate tampering or spoofing
//! - key resolution and configuration failures at `error`
//!
//! Records never contain the token or key material. Subjects can be hashed with
//! [`AuditLogger::privacy_focused`].

use crate::error::{ErrorKind, VerifyError};
use crate::providers::Provider;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Verification outcome to record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VerificationEvent {
    /// Token verified and identity produced
    Verified { provider: String, subject: String },
    /// Token rejected
    Rejected {
        provider: String,
        kind: ErrorKind,
        category: String,
        reason: String,
    },
}

impl VerificationEvent {
    pub(crate) fn verified(provider: Provider, subject: &str) -> Self {
        VerificationEvent::Verified {
            provider: provider.to_string(),
            subject: subject.to_string(),
        }
    }

    pub(crate) fn rejected(provider: Provider, err: &VerifyError) -> Self {
        VerificationEvent::Rejected {
            provider: provider.to_string(),
            kind: err.kind(),
            category: err.category().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Audit logger for verification events
#[derive(Debug, Clone)]
pub struct AuditLogger {
    /// Service name for event attribution
    service_name: String,
    /// Whether to hash subjects
    hash_identifiers: bool,
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new("signin-idtoken")
    }
}

impl AuditLogger {
    /// Create a new audit logger with the given service name
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            hash_identifiers: false,
        }
    }

    /// Create an audit logger that hashes subjects
    pub fn privacy_focused(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            hash_identifiers: true,
        }
    }

    /// Builder method to configure subject hashing
    pub fn with_identifier_hashing(mut self, hash: bool) -> Self {
        self.hash_identifiers = hash;
        self
    }

    /// Log a verification event, returning the audit record id
    pub fn log(&self, event: &VerificationEvent) -> Uuid {
        let audit_id = Uuid::now_v7();

        match event {
            VerificationEvent::Verified { provider, subject } => {
                info!(
                    target: "audit::signin",
                    audit_id = %audit_id,
                    event_type = "token_verified",
                    provider = %provider,
                    subject = %self.maybe_hash(subject),
                    service = %self.service_name,
                    "Identity token verified"
                );
            }
            VerificationEvent::Rejected {
                provider,
                kind,
                category,
                reason,
            } => match kind {
                ErrorKind::Cryptographic => {
                    warn!(
                        target: "audit::signin",
                        audit_id = %audit_id,
                        event_type = "token_rejected",
                        integrity_failure = true,
                        provider = %provider,
                        kind = %kind,
                        category = %category,
                        reason = %reason,
                        service = %self.service_name,
                        "Identity token failed integrity check"
                    );
                }
                ErrorKind::Claim | ErrorKind::Malformed => {
                    info!(
                        target: "audit::signin",
                        audit_id = %audit_id,
                        event_type = "token_rejected",
                        integrity_failure = false,
                        provider = %provider,
                        kind = %kind,
                        category = %category,
                        reason = %reason,
                        service = %self.service_name,
                        "Identity token rejected"
                    );
                }
                ErrorKind::KeyResolution | ErrorKind::Configuration => {
                    error!(
                        target: "audit::signin",
                        audit_id = %audit_id,
                        event_type = "token_unverifiable",
                        provider = %provider,
                        kind = %kind,
                        category = %category,
                        reason = %reason,
                        service = %self.service_name,
                        "Identity token could not be verified"
                    );
                }
            },
        }

        audit_id
    }

    fn maybe_hash(&self, value: &str) -> String {
        if self.hash_identifiers {
            let hash = blake3::hash(value.as_bytes());
            format!("b3:{}", &hash.to_hex()[..16])
        } else {
            value.to_string()
        }
    }
}
