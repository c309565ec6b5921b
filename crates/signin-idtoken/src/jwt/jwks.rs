//! JWKS (JSON Web Key Set) fetching and caching
//!
//! One [`KeySetCache`] is shared by every provider adapter in the process. It
//! maps a key endpoint URL to an immutable [`KeySetEntry`]:
//!
//! - **Cache hit**: a non-expired entry is returned without a network call
//! - **TTL from the provider**: `Cache-Control: max-age` when present and ≥ 1,
//!   otherwise one hour
//! - **Refresh on unknown kid**: [`KeySetCache::resolve`] forces one refresh when
//!   the requested key id is absent, which picks up rotated keys
//!
//! Entries are published as `Arc<KeySetEntry>` and replaced wholesale on
//! refresh. Readers hold their own `Arc`, so a concurrent refresh never exposes a
//! half-built entry. Concurrent refreshes of the same URL are not de-duplicated;
//! the last completed fetch wins.
//!
//! A failed fetch leaves any existing entry in place.

use crate::clock::{Clock, SystemClock};
use crate::error::{VerifyError, VerifyResult};
use dashmap::DashMap;
use reqwest::header::CACHE_CONTROL;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default key set lifetime when the endpoint sends no usable max-age
pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);

/// Default HTTP timeout for key endpoint requests
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Key-type-specific public key material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum KeyMaterial {
    /// RSA modulus and exponent, base64url encoded
    #[serde(rename = "RSA")]
    Rsa { n: String, e: String },

    /// EC curve and coordinates, base64url encoded
    #[serde(rename = "EC")]
    Ec { crv: String, x: String, y: String },

    /// Any other key type; never usable for verification
    #[serde(other)]
    Unsupported,
}

impl KeyMaterial {
    /// The JWK `kty` value for this material
    pub fn key_type(&self) -> &'static str {
        match self {
            KeyMaterial::Rsa { .. } => "RSA",
            KeyMaterial::Ec { .. } => "EC",
            KeyMaterial::Unsupported => "unsupported",
        }
    }
}

/// One public key from a provider's key set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Key ID (kid)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Intended algorithm (alg)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Public key use (use)
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    #[serde(flatten)]
    pub material: KeyMaterial,
}

/// Key set document as served by the endpoint
///
/// Entries stay raw JSON until [`KeySetDocument::into_records`] parses each
/// one independently. A `null` or absent `keys` member is an empty set.
#[derive(Debug, Deserialize)]
struct KeySetDocument {
    #[serde(default)]
    keys: Option<Vec<serde_json::Value>>,
}

impl KeySetDocument {
    /// Convert each entry on its own, skipping entries that do not parse
    fn into_records(self, jwks_uri: &str) -> Vec<KeyRecord> {
        self.keys
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .filter_map(|(index, raw)| match serde_json::from_value::<KeyRecord>(raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(
                        jwks_uri = %jwks_uri,
                        index,
                        error = %e,
                        "Skipping malformed key set entry"
                    );
                    None
                }
            })
            .collect()
    }
}

/// Cached key set for one endpoint. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySetEntry {
    keys: Vec<KeyRecord>,
    /// Absolute expiry, seconds since epoch
    expires_at: u64,
}

impl KeySetEntry {
    pub fn keys(&self) -> &[KeyRecord] {
        &self.keys
    }

    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    /// Check if this entry is still fresh at `now`
    pub fn is_valid_at(&self, now: u64) -> bool {
        now < self.expires_at
    }

    /// Find the position of a key by id
    fn position(&self, kid: &str) -> Option<usize> {
        self.keys.iter().position(|k| k.kid.as_deref() == Some(kid))
    }
}

/// A key found in a cached set, borrowed through the entry that owns it
#[derive(Debug, Clone)]
pub struct ResolvedKey {
    entry: Arc<KeySetEntry>,
    index: usize,
}

impl ResolvedKey {
    pub fn key(&self) -> &KeyRecord {
        &self.entry.keys[self.index]
    }
}

impl std::ops::Deref for ResolvedKey {
    type Target = KeyRecord;

    fn deref(&self) -> &KeyRecord {
        self.key()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of cache entries
    pub total_entries: usize,

    /// Number of expired entries
    pub expired_entries: usize,

    /// Number of valid entries
    pub valid_entries: usize,
}

/// Process-wide key set cache keyed by endpoint URL
///
/// # Example
///
/// ```rust,no_run
/// # use signin_idtoken::jwt::KeySetCache;
/// # tokio_test::block_on(async {
/// let cache = KeySetCache::new()?;
///
/// let key = cache
///     .resolve("https://www.googleapis.com/oauth2/v3/certs", "key-id-123")
///     .await?;
/// println!("resolved {:?}", key.kid);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug)]
pub struct KeySetCache {
    /// HTTP client
    http_client: reqwest::Client,
    /// Endpoint URL -> published entry
    entries: DashMap<String, Arc<KeySetEntry>>,
    /// Time source for expiry
    clock: Arc<dyn Clock>,
    /// TTL when the response carries no usable max-age
    default_ttl: Duration,
}

impl KeySetCache {
    /// Create a cache with default timeout and TTL
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built
    pub fn new() -> VerifyResult<Self> {
        Self::with_options(DEFAULT_FETCH_TIMEOUT, DEFAULT_KEY_TTL, Arc::new(SystemClock))
    }

    /// Create a cache with a custom HTTP timeout, fallback TTL and clock
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built
    pub fn with_options(
        timeout: Duration,
        default_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> VerifyResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| VerifyError::Configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            entries: DashMap::new(),
            clock,
            default_ttl,
        })
    }

    /// The clock this cache reads expiry against
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Get the key set for an endpoint, fetching when missing, expired or forced
    ///
    /// # Errors
    ///
    /// Returns a key-resolution error if the endpoint is unreachable, answers
    /// with a non-success status, or serves no keys.
    pub async fn keys(&self, jwks_uri: &str, force_refresh: bool) -> VerifyResult<Arc<KeySetEntry>> {
        if !force_refresh && let Some(entry) = self.cached(jwks_uri) {
            debug!(jwks_uri = %jwks_uri, "Using cached key set");
            return Ok(entry);
        }

        self.fetch_and_publish(jwks_uri).await
    }

    /// Look up a key id, forcing one refresh if it is not in the current set
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::KeyNotFound`] if the key id is still absent after
    /// the refresh, or any error from fetching the key set.
    pub async fn resolve(&self, jwks_uri: &str, kid: &str) -> VerifyResult<ResolvedKey> {
        let entry = self.keys(jwks_uri, false).await?;
        if let Some(index) = entry.position(kid) {
            return Ok(ResolvedKey { entry, index });
        }

        warn!(
            jwks_uri = %jwks_uri,
            key_id = kid,
            "Key id not in cached key set, refreshing"
        );

        let entry = self.keys(jwks_uri, true).await?;
        match entry.position(kid) {
            Some(index) => Ok(ResolvedKey { entry, index }),
            None => {
                error!(jwks_uri = %jwks_uri, key_id = kid, "Key id not found after refresh");
                Err(VerifyError::KeyNotFound {
                    kid: kid.to_string(),
                })
            }
        }
    }

    /// Get a non-expired entry without touching the network
    fn cached(&self, jwks_uri: &str) -> Option<Arc<KeySetEntry>> {
        let now = self.clock.now_secs();
        self.entries
            .get(jwks_uri)
            .map(|entry| Arc::clone(entry.value()))
            .filter(|entry| entry.is_valid_at(now))
    }

    /// Fetch a key set and publish it as a new entry
    async fn fetch_and_publish(&self, jwks_uri: &str) -> VerifyResult<Arc<KeySetEntry>> {
        info!(jwks_uri = %jwks_uri, "Fetching key set from endpoint");

        validate_endpoint(jwks_uri)?;

        let response = self.http_client.get(jwks_uri).send().await.map_err(|e| {
            error!(jwks_uri = %jwks_uri, error = %e, "Failed to fetch key set");
            VerifyError::key_fetch(jwks_uri, e.to_string())
        })?;

        if !response.status().is_success() {
            error!(
                jwks_uri = %jwks_uri,
                status = %response.status(),
                "Key endpoint returned error status"
            );
            return Err(VerifyError::key_fetch(
                jwks_uri,
                format!("HTTP {}", response.status().as_u16()),
            ));
        }

        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(self.default_ttl);

        let body = response.bytes().await.map_err(|e| {
            error!(jwks_uri = %jwks_uri, error = %e, "Failed to read key set body");
            VerifyError::key_fetch(jwks_uri, e.to_string())
        })?;

        let document: KeySetDocument = serde_json::from_slice(&body).map_err(|e| {
            error!(jwks_uri = %jwks_uri, error = %e, "Failed to parse key set JSON");
            VerifyError::key_fetch(jwks_uri, format!("invalid key set document: {e}"))
        })?;

        let keys = document.into_records(jwks_uri);
        if keys.is_empty() {
            error!(jwks_uri = %jwks_uri, "Key set contains no usable keys");
            return Err(VerifyError::NoKeysFound {
                endpoint: jwks_uri.to_string(),
            });
        }

        let entry = Arc::new(KeySetEntry {
            keys,
            expires_at: self.clock.now_secs().saturating_add(ttl.as_secs()),
        });

        info!(
            jwks_uri = %jwks_uri,
            key_count = entry.keys.len(),
            ttl_secs = ttl.as_secs(),
            "Successfully fetched key set"
        );

        self.entries.insert(jwks_uri.to_string(), Arc::clone(&entry));
        Ok(entry)
    }

    /// Drop the entry for one endpoint
    pub fn invalidate(&self, jwks_uri: &str) {
        if self.entries.remove(jwks_uri).is_some() {
            debug!(jwks_uri = %jwks_uri, "Key set cache entry invalidated");
        }
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.entries.clear();
        debug!("Key set cache cleared");
    }

    /// Number of cached endpoints
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        let now = self.clock.now_secs();
        let total_entries = self.entries.len();
        let expired_entries = self
            .entries
            .iter()
            .filter(|entry| !entry.is_valid_at(now))
            .count();

        CacheStats {
            total_entries,
            expired_entries,
            valid_entries: total_entries - expired_entries,
        }
    }
}

/// Key endpoints must use HTTPS (plain HTTP only for loopback)
fn validate_endpoint(jwks_uri: &str) -> VerifyResult<()> {
    let loopback = ["http://localhost", "http://127.0.0.1", "http://[::1]"];
    let is_loopback = loopback.iter().any(|prefix| {
        jwks_uri
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(':') || rest.starts_with('/'))
    });
    if jwks_uri.starts_with("https://") || is_loopback {
        Ok(())
    } else {
        Err(VerifyError::Configuration(format!(
            "key endpoint must use HTTPS: {jwks_uri}"
        )))
    }
}

/// Parse the max-age directive; values below one second are ignored
fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| {
            let (name, value) = directive.trim().split_once('=')?;
            if !name.trim().eq_ignore_ascii_case("max-age") {
                return None;
            }
            value.trim().trim_matches('"').parse::<u64>().ok()
        })
        .find(|&secs| secs >= 1)
        .map(Duration::from_secs)
}
