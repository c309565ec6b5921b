//! # Signin IdToken - Federated Identity Token Verification
//!
//! Verifies the identity tokens a client obtains from "Sign in with Google" and
//! "Sign in with Apple" and turns them into a trusted [`VerifiedIdentity`].
//!
//! ## Design Principles
//!
//! - **Fail Closed**: any failed stage rejects the token; there is no partial trust
//! - **Bytes As Signed**: signatures are checked over the exact `header.payload`
//!   segments received, never a re-encoding
//! - **Pinned Algorithm**: each provider accepts exactly one algorithm (RS256)
//! - **Shared Key Cache**: one cache per process, keyed by key set URL, refreshed
//!   at most once per unknown key id
//!
//! ## Verification Pipeline
//!
//! ```text
//! compact token
//!   └─▶ decompose (3 segments, header + claims JSON)
//!         └─▶ algorithm check
//!               └─▶ key lookup by kid (cached; one forced refresh on miss)
//!                     └─▶ signature verification
//!                           └─▶ issuer → audience → expiry → subject
//!                                 └─▶ VerifiedIdentity
//! ```
//!
//! ## Architecture
//!
//! - [`providers`] - Google, Apple and federated verifiers
//! - [`jwt`] - Token decomposition, key set cache, signature and claim checks
//! - [`config`] - Allowed audiences and operational settings
//! - [`error`] - Failure taxonomy
//! - [`audit`] - Structured verification audit records
//! - [`clock`] - Time source for expiry and cache freshness
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use signin_idtoken::{FederatedVerifier, Provider, VerifierConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = VerifierConfig {
//!     google_audiences: vec!["1234.apps.googleusercontent.com".to_string()],
//!     apple_audiences: vec!["com.example.app".to_string()],
//!     ..Default::default()
//! };
//!
//! let verifier = FederatedVerifier::from_config(&config)?;
//! let identity = verifier.verify(Provider::Apple, "eyJ...").await?;
//!
//! println!("{} user {}", identity.provider(), identity.subject());
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod jwt;
pub mod providers;

#[doc(inline)]
pub use audit::{AuditLogger, VerificationEvent};

#[doc(inline)]
pub use clock::{Clock, SystemClock};

#[doc(inline)]
pub use config::{EmailPolicy, VerifierConfig};

#[doc(inline)]
pub use error::{ErrorKind, VerifyError, VerifyResult};

#[doc(inline)]
pub use jwt::{CacheStats, KeySetCache};

#[doc(inline)]
pub use providers::{
    AppleVerifier, FederatedVerifier, GoogleVerifier, IdTokenVerifier, Provider, ProviderProfile,
    UnknownProvider, VerifiedIdentity,
};
