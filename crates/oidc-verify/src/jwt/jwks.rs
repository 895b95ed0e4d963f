//! JWKS (JSON Web Key Set) fetching, caching and key selection
//!
//! - **Per-URI caching**: key sets are cached per JWKS URI with a TTL
//!   (default 5 minutes) behind a read-mostly lock
//! - **Rotation refetch**: a key ID missing from a cached set forces exactly one
//!   refetch before the lookup fails
//! - **Lenient parsing**: individual entries that are not valid JWKs are skipped,
//!   the set fails only when nothing usable remains
//! - **Signing keys only**: entries with `use` other than `sig` are never selected

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::{Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{Instrument, Span, debug, error, info, warn};

use crate::config::{ConfigError, VerifierConfig};
use crate::http::{FetchError, HttpFetcher};
use crate::token::UnverifiedHeader;

/// Key resolution errors
#[derive(Debug, Error)]
pub enum KeyResolutionError {
    /// The JWKS document could not be fetched
    #[error("unable to retrieve signing key: failed to fetch JWKS from '{url}': {source}")]
    Fetch {
        /// JWKS URI
        url: String,
        /// Underlying fetch failure
        #[source]
        source: FetchError,
    },

    /// The JWKS document is not a JWK Set
    #[error("unable to retrieve signing key: invalid JWKS from '{url}': {message}")]
    InvalidJwks {
        /// JWKS URI
        url: String,
        /// What was wrong
        message: String,
    },

    /// The token header could not be decoded
    #[error("unable to retrieve signing key: {0}")]
    InvalidHeader(String),

    /// The token header has no `kid`
    #[error("unable to retrieve signing key: token header has no 'kid'")]
    MissingKeyId,

    /// No signing key in the set matches the token's `kid` and `alg`
    #[error("unable to retrieve signing key: no signing key matching kid '{key_id}' in JWKS from '{url}'")]
    KeyNotFound {
        /// Key ID from the token header
        key_id: String,
        /// JWKS URI
        url: String,
    },

    /// The matching JWK could not be converted into a verification key
    #[error("unable to retrieve signing key: invalid JWK '{key_id}': {source}")]
    InvalidKey {
        /// Key ID of the rejected JWK
        key_id: String,
        /// Conversion failure
        #[source]
        source: jsonwebtoken::errors::Error,
    },
}

/// JWKS cache entry with metadata
#[derive(Debug, Clone)]
struct CachedJwks {
    /// The JWK set
    jwks: Arc<JwkSet>,
    /// When this was cached
    cached_at: SystemTime,
    /// TTL for this cache entry
    ttl: Duration,
}

impl CachedJwks {
    /// Check if this cache entry is still valid
    fn is_valid(&self) -> bool {
        match SystemTime::now().duration_since(self.cached_at) {
            Ok(age) => age < self.ttl,
            Err(_) => false, // Clock went backwards, invalidate
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of cache entries
    pub total_entries: usize,

    /// Number of expired entries
    pub expired_entries: usize,

    /// Number of valid entries
    pub valid_entries: usize,
}

/// A verification key selected from a JWKS
#[derive(Clone)]
pub struct SigningKey {
    key_id: String,
    jwk: Jwk,
    decoding_key: DecodingKey,
}

// Key material stays out of Debug output
impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    pub(crate) fn from_jwk(jwk: &Jwk, key_id: &str) -> Result<Self, KeyResolutionError> {
        let decoding_key = DecodingKey::from_jwk(jwk).map_err(|e| {
            error!(key_id, error = %e, "Failed to create decoding key from JWK");
            KeyResolutionError::InvalidKey {
                key_id: key_id.to_string(),
                source: e,
            }
        })?;

        Ok(Self {
            key_id: key_id.to_string(),
            jwk: jwk.clone(),
            decoding_key,
        })
    }

    /// Key ID of the selected JWK
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Algorithm advertised by the JWK (`alg`), if any
    pub fn algorithm(&self) -> Option<String> {
        self.jwk.common.key_algorithm.as_ref().and_then(key_algorithm_name)
    }

    /// Key material for the signature primitive
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

/// Resolves the signing key referenced by a token from a JWKS endpoint
///
/// Clones share the same cache and connection pool, so one resolver can serve
/// many concurrent verifications.
///
/// # Example
///
/// ```rust,no_run
/// # use oidc_verify::jwt::KeyResolver;
/// # async fn example(token: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let resolver = KeyResolver::new()?;
/// let key = resolver
///     .resolve("https://idp.example/.well-known/jwks.json", token)
///     .await?;
/// println!("token signed with {}", key.key_id());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct KeyResolver {
    http: HttpFetcher,
    cache: Arc<RwLock<HashMap<String, CachedJwks>>>,
    cache_enabled: bool,
    cache_ttl: Duration,
    span: Span,
}

impl KeyResolver {
    /// Create a resolver with default settings
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_config(&VerifierConfig::default())
    }

    /// Create a resolver with custom configuration
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or HTTP client creation fails
    pub fn with_config(config: &VerifierConfig) -> Result<Self, ConfigError> {
        let client = config.build_http_client()?;
        Ok(Self::with_http_client(client, config))
    }

    /// Create a resolver around an existing HTTP client
    pub fn with_http_client(client: reqwest::Client, config: &VerifierConfig) -> Self {
        Self {
            http: HttpFetcher::new(client, config),
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_enabled: config.cache_jwks,
            cache_ttl: config.jwks_cache_ttl,
            span: Span::none(),
        }
    }

    /// Attach this resolver's events to `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Resolve the key that signed `token` from the set at `jwks_uri`
    ///
    /// # Errors
    ///
    /// Returns [`KeyResolutionError`] if:
    /// - the token header cannot be decoded or has no `kid`
    /// - the JWKS cannot be fetched or parsed
    /// - no signing key matches the `kid` (after one refetch if the set was cached)
    /// - the matching JWK is malformed
    pub async fn resolve(
        &self,
        jwks_uri: &str,
        token: &str,
    ) -> Result<SigningKey, KeyResolutionError> {
        self.resolve_inner(jwks_uri, token)
            .instrument(self.span.clone())
            .await
    }

    async fn resolve_inner(
        &self,
        jwks_uri: &str,
        token: &str,
    ) -> Result<SigningKey, KeyResolutionError> {
        let header = UnverifiedHeader::decode(token).map_err(|e| {
            debug!(error = %e, "Failed to decode token header");
            KeyResolutionError::InvalidHeader(e.to_string())
        })?;

        let Some(key_id) = header.kid.as_deref() else {
            warn!(jwks_uri, "Token header missing kid");
            return Err(KeyResolutionError::MissingKeyId);
        };

        if let Some(cached) = self.cached(jwks_uri).await {
            if let Some(jwk) = select_key(&cached, key_id, &header.alg) {
                debug!(jwks_uri, key_id, "Resolved signing key from cached JWKS");
                return SigningKey::from_jwk(jwk, key_id);
            }
            warn!(
                jwks_uri,
                key_id, "Key ID not found in cached JWKS, refreshing for key rotation"
            );
        }

        let jwks = self.fetch_and_cache(jwks_uri).await?;
        let jwk = select_key(&jwks, key_id, &header.alg).ok_or_else(|| {
            error!(jwks_uri, key_id, algorithm = %header.alg, "Key ID not found in JWKS");
            KeyResolutionError::KeyNotFound {
                key_id: key_id.to_string(),
                url: jwks_uri.to_string(),
            }
        })?;

        debug!(jwks_uri, key_id, "Resolved signing key");
        SigningKey::from_jwk(jwk, key_id)
    }

    /// Fetch the set at `jwks_uri`, bypassing and then updating the cache
    ///
    /// # Errors
    ///
    /// Returns [`KeyResolutionError`] if the set cannot be fetched or parsed
    pub async fn refresh(&self, jwks_uri: &str) -> Result<Arc<JwkSet>, KeyResolutionError> {
        self.fetch_and_cache(jwks_uri)
            .instrument(self.span.clone())
            .await
    }

    async fn cached(&self, jwks_uri: &str) -> Option<Arc<JwkSet>> {
        if !self.cache_enabled {
            return None;
        }
        let cache = self.cache.read().await;
        cache
            .get(jwks_uri)
            .filter(|entry| entry.is_valid())
            .map(|entry| Arc::clone(&entry.jwks))
    }

    /// Fetch JWKS from endpoint and update cache
    async fn fetch_and_cache(&self, jwks_uri: &str) -> Result<Arc<JwkSet>, KeyResolutionError> {
        info!(jwks_uri, "Fetching JWKS from endpoint");

        let body = self.http.get(jwks_uri).await.map_err(|e| {
            error!(jwks_uri, error = %e, "Failed to fetch JWKS");
            KeyResolutionError::Fetch {
                url: jwks_uri.to_string(),
                source: e,
            }
        })?;

        let jwks = Arc::new(parse_jwks(&body, jwks_uri)?);

        info!(
            jwks_uri,
            key_count = jwks.keys.len(),
            "Successfully fetched JWKS"
        );

        if self.cache_enabled {
            let mut cache = self.cache.write().await;
            // Only live sets stay in the map
            cache.retain(|_, entry| entry.is_valid());
            cache.insert(
                jwks_uri.to_string(),
                CachedJwks {
                    jwks: Arc::clone(&jwks),
                    cached_at: SystemTime::now(),
                    ttl: self.cache_ttl,
                },
            );
        }

        Ok(jwks)
    }

    /// Clear the cache
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
        debug!("JWKS cache cleared");
    }

    /// Get cache statistics
    pub async fn cache_stats(&self) -> CacheStats {
        let cache = self.cache.read().await;
        let total_entries = cache.len();
        let valid_entries = cache.values().filter(|entry| entry.is_valid()).count();

        CacheStats {
            total_entries,
            expired_entries: total_entries - valid_entries,
            valid_entries,
        }
    }
}

#[derive(Deserialize)]
struct RawJwkSet {
    keys: Vec<serde_json::Value>,
}

/// Parse a JWK Set, skipping entries that are not valid JWKs
fn parse_jwks(body: &[u8], jwks_uri: &str) -> Result<JwkSet, KeyResolutionError> {
    let raw: RawJwkSet = serde_json::from_slice(body).map_err(|e| {
        error!(jwks_uri, error = %e, "Failed to parse JWKS JSON");
        KeyResolutionError::InvalidJwks {
            url: jwks_uri.to_string(),
            message: e.to_string(),
        }
    })?;

    if raw.keys.is_empty() {
        return Err(KeyResolutionError::InvalidJwks {
            url: jwks_uri.to_string(),
            message: "the JWK Set did not contain any keys".to_string(),
        });
    }

    let mut keys = Vec::with_capacity(raw.keys.len());
    for (index, value) in raw.keys.into_iter().enumerate() {
        match serde_json::from_value::<Jwk>(value) {
            Ok(jwk) => keys.push(jwk),
            Err(e) => warn!(jwks_uri, index, error = %e, "Skipping unusable JWK"),
        }
    }

    if keys.is_empty() {
        return Err(KeyResolutionError::InvalidJwks {
            url: jwks_uri.to_string(),
            message: "the JWK Set did not contain any usable keys".to_string(),
        });
    }

    Ok(JwkSet { keys })
}

/// Find the signing key for `key_id`, honoring the JWK's `use` and `alg`
fn select_key<'a>(jwks: &'a JwkSet, key_id: &str, algorithm: &str) -> Option<&'a Jwk> {
    jwks.keys.iter().find(|jwk| {
        jwk.common.key_id.as_deref() == Some(key_id)
            && matches!(
                jwk.common.public_key_use,
                None | Some(PublicKeyUse::Signature)
            )
            && jwk
                .common
                .key_algorithm
                .as_ref()
                .is_none_or(|alg| key_algorithm_name(alg).as_deref() == Some(algorithm))
    })
}

/// JOSE name of a JWK algorithm, e.g. `RS256`
fn key_algorithm_name(algorithm: &KeyAlgorithm) -> Option<String> {
    match serde_json::to_value(algorithm) {
        Ok(serde_json::Value::String(name)) => Some(name),
        _ => None,
    }
}
