//! # Discovery Document Fetcher

use tracing::{Instrument, Span, debug, error, info, warn};

use super::types::{DiscoveryError, OidcConfiguration, WELL_KNOWN_PATH};
use crate::config::{ConfigError, VerifierConfig};
use crate::http::HttpFetcher;

/// Build the discovery URL for an issuer
///
/// The issuer is not normalized: `https://idp.example/` yields
/// `https://idp.example//.well-known/openid-configuration`.
pub fn discovery_url(issuer: &str) -> String {
    format!("{issuer}{WELL_KNOWN_PATH}")
}

/// Fetches OpenID Connect configuration documents
///
/// Cloning is cheap and clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    http: HttpFetcher,
    span: Span,
}

impl DiscoveryClient {
    /// Create a discovery client with default configuration
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_config(&VerifierConfig::default())
    }

    /// Create a discovery client with custom configuration
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or HTTP client creation fails
    pub fn with_config(config: &VerifierConfig) -> Result<Self, ConfigError> {
        let client = config.build_http_client()?;
        Ok(Self::with_http_client(client, config))
    }

    /// Create a discovery client around an existing HTTP client
    pub fn with_http_client(client: reqwest::Client, config: &VerifierConfig) -> Self {
        Self {
            http: HttpFetcher::new(client, config),
            span: Span::none(),
        }
    }

    /// Attach this client's events to `span`
    ///
    /// By default events are recorded in whatever span is current at the call site.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Fetch and validate the configuration for `issuer`
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] if the request fails, the server answers
    /// with a non-2xx status, or the document is invalid.
    pub async fn discover(&self, issuer: &str) -> Result<OidcConfiguration, DiscoveryError> {
        self.discover_inner(issuer)
            .instrument(self.span.clone())
            .await
    }

    async fn discover_inner(&self, issuer: &str) -> Result<OidcConfiguration, DiscoveryError> {
        let url = discovery_url(issuer);
        debug!(issuer, discovery_url = %url, "Fetching OIDC configuration");

        let body = self.http.get(&url).await.map_err(|e| {
            error!(discovery_url = %url, error = %e, "Failed to fetch OIDC configuration");
            DiscoveryError::Fetch {
                url: url.clone(),
                source: e,
            }
        })?;

        let config = OidcConfiguration::from_slice(&body, &url).map_err(|e| {
            error!(discovery_url = %url, error = %e, "Invalid OIDC configuration");
            e
        })?;

        if let Some(advertised) = config.issuer.as_deref()
            && advertised != issuer
        {
            warn!(
                issuer,
                advertised, "OIDC configuration advertises a different issuer"
            );
        }

        info!(
            issuer,
            jwks_uri = %config.jwks_uri,
            algorithms = ?config.id_token_signing_alg_values_supported,
            "Discovered OIDC configuration"
        );

        Ok(config)
    }
}
