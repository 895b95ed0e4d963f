//! Verifier configuration
//!
//! All fields have serde defaults, so a partial document (or `{}`) deserializes
//! into a working configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building a verifier
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The HTTP client could not be constructed
    #[error("failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Configuration shared by discovery, key resolution and verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Timeout for each HTTP request (default: 10 seconds)
    pub request_timeout: Duration,

    /// User agent for HTTP requests
    pub user_agent: String,

    /// Redirects followed per request; 0 disables redirects (default: 10)
    pub max_redirects: usize,

    /// Maximum discovery or JWKS body size in bytes (default: 64 KiB)
    pub max_response_size: usize,

    /// Reject plain-HTTP discovery and JWKS URLs, except for loopback hosts
    pub require_https: bool,

    /// Cache fetched key sets per JWKS URI (default: true)
    pub cache_jwks: bool,

    /// How long a fetched key set stays fresh (default: 5 minutes)
    pub jwks_cache_ttl: Duration,

    /// Leeway applied to `exp` and `nbf` (default: none)
    pub clock_skew_leeway: Duration,

    /// Reject tokens whose `exp` has passed
    pub validate_exp: bool,

    /// Reject tokens whose `nbf` is in the future
    pub validate_nbf: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            user_agent: format!("oidc-verify/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
            max_response_size: 64 * 1024,
            require_https: false,
            cache_jwks: true,
            jwks_cache_ttl: Duration::from_secs(300),
            clock_skew_leeway: Duration::ZERO,
            validate_exp: true,
            validate_nbf: true,
        }
    }
}

impl VerifierConfig {
    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the maximum accepted response body size
    pub fn with_max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = bytes;
        self
    }

    /// Require HTTPS for all fetched URLs (loopback exempt)
    pub fn with_require_https(mut self, require: bool) -> Self {
        self.require_https = require;
        self
    }

    /// Enable or disable JWKS caching
    pub fn with_jwks_cache(mut self, enabled: bool) -> Self {
        self.cache_jwks = enabled;
        self
    }

    /// Set how long a cached key set stays fresh
    pub fn with_jwks_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache_ttl = ttl;
        self
    }

    /// Set the clock skew tolerance for `exp` and `nbf`
    pub fn with_clock_skew(mut self, leeway: Duration) -> Self {
        self.clock_skew_leeway = leeway;
        self
    }

    /// Check that values are usable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero request timeout or a zero
    /// response size limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_response_size == 0 {
            return Err(ConfigError::Invalid(
                "max_response_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the HTTP client described by this configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation fails or the client cannot be built.
    pub fn build_http_client(&self) -> Result<reqwest::Client, ConfigError> {
        self.validate()?;

        let redirect = if self.max_redirects == 0 {
            reqwest::redirect::Policy::none()
        } else {
            reqwest::redirect::Policy::limited(self.max_redirects)
        };

        Ok(reqwest::Client::builder()
            .timeout(self.request_timeout)
            .user_agent(&self.user_agent)
            .redirect(redirect)
            .build()?)
    }
}
