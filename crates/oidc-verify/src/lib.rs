//! # oidc-verify - OpenID Connect ID Token Verification
//!
//! Verifies OpenID Connect ID tokens against their issuer: discovers the
//! issuer's configuration, resolves the signing key from its JWKS and checks
//! signature, algorithm, audience, issuer and time claims.
//!
//! ## Key Features
//!
//! - **Issuer discovery** - `{issuer}/.well-known/openid-configuration`
//! - **JWKS caching** - per-URI TTL cache with a forced refetch on key rotation
//! - **Algorithm negotiation** - only algorithms the issuer advertises are accepted
//! - **Claim derivation** - issuer and client ID can be read from the token itself
//! - **Typed errors** - every failure maps to one [`ErrorKind`]
//!
//! ## Architecture
//!
//! - [`token`] - Unverified JWS decoding (header and payload)
//! - [`claims`] - Unverified claim extraction and verified claim access
//! - [`discovery`] - OIDC configuration discovery
//! - [`jwt`] - Key resolution and the verification pipeline
//! - [`config`] - HTTP, cache and validation settings
//! - [`error`] - Top-level error taxonomy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oidc_verify::{ErrorKind, TokenVerifier};
//!
//! # async fn example(token: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = TokenVerifier::new()?;
//!
//! match verifier.verify(token, None, Some("my-client-id")).await {
//!     Ok(claims) => println!("hello {:?}", claims.subject()),
//!     Err(e) if e.kind() == ErrorKind::TokenVerification => println!("rejected: {e}"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Notes
//!
//! When `issuer` is not supplied it is read from the unverified token, so any
//! issuer reachable over the network is trusted. Pin the issuer whenever it is
//! known, and consider [`VerifierConfig::with_require_https`].

pub mod claims;
pub mod config;
pub mod discovery;
pub mod error;
mod http;
pub mod jwt;
pub mod token;

#[cfg(test)]
mod test_support;

#[doc(inline)]
pub use claims::{ClaimsError, UnverifiedClaims, VerifiedClaims, extract_unverified_claims};

#[doc(inline)]
pub use config::{ConfigError, VerifierConfig};

#[doc(inline)]
pub use discovery::{DiscoveryClient, DiscoveryError, OidcConfiguration};

#[doc(inline)]
pub use error::{ErrorKind, Result, VerifyError};

#[doc(inline)]
pub use http::FetchError;

#[doc(inline)]
pub use jwt::{
    CacheStats, KeyResolutionError, KeyResolver, SigningKey, TokenVerificationError,
    TokenVerifier,
};

#[doc(inline)]
pub use token::{UnverifiedHeader, UnverifiedToken};
