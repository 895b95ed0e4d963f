//! # Issuer Discovery
//!
//! Fetches an issuer's OpenID Connect configuration from
//! `{issuer}/.well-known/openid-configuration` and extracts the two values the
//! verifier needs: the JWKS URI and the list of ID token signing algorithms.
//!
//! ## Behavior
//!
//! - The issuer string is used verbatim; a trailing slash is not trimmed.
//! - One GET per call. Discovery results are not cached.
//! - A missing `id_token_signing_alg_values_supported` defaults to `["RS256"]`;
//!   an empty or `null` list is an error.
//!
//! ```rust,no_run
//! use oidc_verify::discovery::DiscoveryClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DiscoveryClient::new()?;
//! let config = client.discover("https://accounts.google.com").await?;
//! println!("keys at {}", config.jwks_uri);
//! # Ok(())
//! # }
//! ```

mod fetcher;
mod types;

pub use fetcher::{DiscoveryClient, discovery_url};
pub use types::{
    DEFAULT_SIGNING_ALGORITHM, DiscoveryError, OidcConfiguration, WELL_KNOWN_PATH,
};
