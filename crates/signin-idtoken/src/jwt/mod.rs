//! JWT infrastructure for identity token verification
//!
//! # Architecture
//!
//! ```text
//!  token ──▶ token::ParsedToken ──▶ jwks::KeySetCache::resolve ──▶ signature ──▶ claims
//!            (decompose)            (cached, refresh on miss)      (RS256)      (iss/aud/exp/sub)
//! ```
//!
//! # Modules
//!
//! - `codec` - Base64URL decoding
//! - `token` - Compact token decomposition
//! - `jwks` - Key set fetching and caching
//! - `signature` - Signature verification
//! - `claims` - Claims validation

pub mod claims;
pub mod codec;
pub mod jwks;
pub mod signature;
pub mod token;

pub use claims::{ValidatedClaims, validate_claims};
pub use jwks::{CacheStats, KeyMaterial, KeyRecord, KeySetCache, KeySetEntry, ResolvedKey};
pub use signature::verify_signature;
pub use token::{Audience, ParsedToken, TokenClaims, TokenHeader};
