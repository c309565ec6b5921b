//! Common test utilities for integration tests
//!
//! Provides a mock key endpoint, RSA signing keys, token minting and a
//! controllable clock for exercising the full verification pipeline.

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use once_cell::sync::Lazy;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{Value, json};
use signin_idtoken::jwt::jwks::DEFAULT_KEY_TTL;
use signin_idtoken::{Clock, IdTokenVerifier, KeySetCache, ProviderProfile};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// Fixed "current time" used by every pipeline test
pub const NOW: u64 = 1_800_000_000;

pub const GOOGLE_CLIENT_ID: &str = "1234-web.apps.googleusercontent.com";
pub const APPLE_CLIENT_ID: &str = "com.example.app";

/// Key the mock endpoint publishes first
pub static PRIMARY_KEY: Lazy<TestKey> = Lazy::new(|| TestKey::generate("primary-key"));

/// Key the provider rotates to
pub static ROTATED_KEY: Lazy<TestKey> = Lazy::new(|| TestKey::generate("rotated-key"));

/// Key never published by the endpoint
pub static ROGUE_KEY: Lazy<TestKey> = Lazy::new(|| TestKey::generate("rogue-key"));

/// RSA signing key with its published JWK form
pub struct TestKey {
    pub kid: String,
    encoding_key: EncodingKey,
    public_key: RsaPublicKey,
}

impl TestKey {
    /// Generate a 2048-bit RSA key pair
    pub fn generate(kid: &str) -> Self {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("Failed to generate RSA key");
        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .expect("Failed to encode private key");
        let encoding_key =
            EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("Invalid RSA key");

        Self {
            kid: kid.to_string(),
            encoding_key,
            public_key: private_key.to_public_key(),
        }
    }

    /// Public JWK as a provider would publish it
    pub fn jwk(&self) -> Value {
        json!({
            "kty": "RSA",
            "kid": self.kid,
            "use": "sig",
            "alg": "RS256",
            "n": URL_SAFE_NO_PAD.encode(self.public_key.n().to_bytes_be()),
            "e": URL_SAFE_NO_PAD.encode(self.public_key.e().to_bytes_be()),
        })
    }

    /// Sign claims as RS256 with this key's id
    pub fn sign(&self, claims: &Value) -> String {
        self.sign_as(&self.kid, claims)
    }

    /// Sign claims as RS256, advertising an arbitrary key id
    pub fn sign_as(&self, kid: &str, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());
        header.kid = Some(kid.to_string());
        jsonwebtoken::encode(&header, claims, &self.encoding_key)
            .expect("Failed to encode test JWT")
    }
}

/// Key set document containing the given keys
pub fn key_set(keys: &[&TestKey]) -> Value {
    json!({ "keys": keys.iter().map(|k| k.jwk()).collect::<Vec<_>>() })
}

/// Base64url-encode a JSON value as a token segment
pub fn segment(value: &Value) -> String {
    URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).expect("Failed to serialize segment"))
}

/// Assemble a compact token from raw parts
pub fn assemble(header: &Value, claims: &Value, signature: &str) -> String {
    format!("{}.{}.{}", segment(header), segment(claims), signature)
}

/// Signature segment of a compact token
pub fn signature_of(token: &str) -> &str {
    token.rsplit('.').next().expect("token has a signature segment")
}

/// Google ID token claims expiring `exp_offset` seconds after [`NOW`]
pub fn google_claims(sub: &str, aud: &str, exp_offset: i64) -> Value {
    json!({
        "iss": "https://accounts.google.com",
        "sub": sub,
        "aud": aud,
        "iat": NOW,
        "exp": NOW as i64 + exp_offset,
        "email": "Alice.Example@Gmail.com",
        "email_verified": true,
        "name": "Alice Example",
    })
}

/// Apple identity token claims expiring `exp_offset` seconds after [`NOW`]
pub fn apple_claims(sub: &str, aud: &str, exp_offset: i64) -> Value {
    json!({
        "iss": "https://appleid.apple.com",
        "sub": sub,
        "aud": aud,
        "iat": NOW,
        "exp": NOW as i64 + exp_offset,
        "email": "relay@privaterelay.appleid.com",
        "email_verified": "true",
        "is_private_email": "true",
    })
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct FixedClock(AtomicU64);

impl FixedClock {
    pub fn at(now: u64) -> Arc<Self> {
        Arc::new(Self(AtomicU64::new(now)))
    }

    pub fn set(&self, now: u64) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_secs(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Mock provider key endpoint
pub struct MockKeyEndpoint {
    pub server: MockServer,
    pub jwks_uri: String,
}

impl MockKeyEndpoint {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let jwks_uri = format!("{}/jwks", server.uri());
        Self { server, jwks_uri }
    }

    /// Serve a key set on every request
    pub async fn mock_keys(&self, document: Value, max_age: Option<u64>) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(key_set_response(document, max_age))
            .mount(&self.server)
            .await;
    }

    /// Serve a key set for the next request only
    pub async fn mock_keys_once(&self, document: Value, max_age: Option<u64>) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(key_set_response(document, max_age))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    /// Answer every request with an error status
    pub async fn mock_status(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Number of requests the endpoint has received
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    /// Google profile pointed at this endpoint
    pub fn google_profile(&self) -> ProviderProfile {
        ProviderProfile::google().with_jwks_uri(&self.jwks_uri)
    }

    /// Apple profile pointed at this endpoint
    pub fn apple_profile(&self) -> ProviderProfile {
        ProviderProfile::apple().with_jwks_uri(&self.jwks_uri)
    }
}

fn key_set_response(document: Value, max_age: Option<u64>) -> ResponseTemplate {
    let mut response = ResponseTemplate::new(200).set_body_json(document);
    if let Some(secs) = max_age {
        response = response.insert_header("Cache-Control", format!("public, max-age={secs}"));
    }
    response
}

/// Key set cache reading time from `clock`
pub fn cache_with_clock(clock: Arc<FixedClock>) -> Arc<KeySetCache> {
    Arc::new(
        KeySetCache::with_options(Duration::from_secs(5), DEFAULT_KEY_TTL, clock)
            .expect("Failed to build key set cache"),
    )
}

/// Install a test-writer subscriber honouring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Google verifier against the mock endpoint at [`NOW`]
pub fn google_verifier(endpoint: &MockKeyEndpoint) -> (IdTokenVerifier, Arc<FixedClock>) {
    init_tracing();
    let clock = FixedClock::at(NOW);
    let verifier = IdTokenVerifier::new(endpoint.google_profile(), cache_with_clock(clock.clone()));
    (verifier, clock)
}

/// Allowed audience list for Google tests
pub fn google_audiences() -> Vec<String> {
    vec![GOOGLE_CLIENT_ID.to_string()]
}

/// Allowed audience list for Apple tests
pub fn apple_audiences() -> Vec<String> {
    vec![APPLE_CLIENT_ID.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwk_shape() {
        let jwk = PRIMARY_KEY.jwk();
        assert_eq!(jwk["kty"], "RSA");
        assert_eq!(jwk["kid"], "primary-key");
        assert_eq!(jwk["e"], "AQAB");
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::at(10);
        clock.advance(5);
        assert_eq!(clock.now_secs(), 15);
        clock.set(1);
        assert_eq!(clock.now_secs(), 1);
    }
}
