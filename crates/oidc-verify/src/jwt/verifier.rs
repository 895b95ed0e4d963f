//! ID token verification pipeline
//!
//! [`TokenVerifier::verify`] runs the full flow:
//!
//! 1. Decode the token without verification (malformed tokens stop here)
//! 2. Take issuer and client ID from the caller, or derive them from `iss`/`aud`
//! 3. Discover the issuer's configuration
//! 4. Resolve the signing key from the issuer's JWKS
//! 5. Verify signature, algorithm, audience, issuer and time claims
//!
//! # Algorithm negotiation
//!
//! The token's `alg` must appear in the issuer's
//! `id_token_signing_alg_values_supported` (or the `RS256` default). The
//! signature is then checked under exactly that algorithm, so a key of the
//! wrong family is rejected rather than reinterpreted.

use std::str::FromStr;

use jsonwebtoken::{Algorithm, Validation, decode};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{Instrument, Span, debug, warn};

use super::jwks::{KeyResolver, SigningKey};
use crate::claims::VerifiedClaims;
use crate::config::{ConfigError, VerifierConfig};
use crate::discovery::{DiscoveryClient, OidcConfiguration};
use crate::error::Result;
use crate::token::UnverifiedToken;

/// Final verification errors
#[derive(Debug, Error)]
pub enum TokenVerificationError {
    /// The token's `alg` is not in the issuer's supported list
    #[error("token verification failed: algorithm '{algorithm}' not allowed, supported: {allowed:?}")]
    AlgorithmNotAllowed {
        /// Algorithm declared by the token
        algorithm: String,
        /// Algorithms advertised by the issuer
        allowed: Vec<String>,
    },

    /// Signature or claim validation failed
    #[error("token verification failed: {0}")]
    Rejected(#[from] jsonwebtoken::errors::Error),
}

/// OpenID Connect ID token verifier
///
/// Holds a discovery client and a key resolver sharing one HTTP client. The
/// verifier is cheap to clone and clones share the JWKS cache.
///
/// # Example
///
/// ```rust,no_run
/// # use oidc_verify::TokenVerifier;
/// # async fn example(token: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let verifier = TokenVerifier::new()?;
///
/// // Issuer and client ID derived from the token itself
/// let claims = verifier.verify(token, None, None).await?;
///
/// // Or pinned by the caller
/// let claims = verifier
///     .verify(token, Some("https://accounts.google.com"), Some("my-client-id"))
///     .await?;
/// println!("verified subject: {:?}", claims.subject());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    discovery: DiscoveryClient,
    keys: KeyResolver,
    clock_skew_leeway: u64,
    validate_exp: bool,
    validate_nbf: bool,
    span: Span,
}

impl TokenVerifier {
    /// Create a verifier with default configuration
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails
    pub fn new() -> std::result::Result<Self, ConfigError> {
        Self::with_config(&VerifierConfig::default())
    }

    /// Create a verifier with custom configuration
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or HTTP client creation fails
    pub fn with_config(config: &VerifierConfig) -> std::result::Result<Self, ConfigError> {
        let client = config.build_http_client()?;
        Ok(Self::with_http_client(client, config))
    }

    /// Create a verifier around an existing HTTP client
    pub fn with_http_client(client: reqwest::Client, config: &VerifierConfig) -> Self {
        Self {
            discovery: DiscoveryClient::with_http_client(client.clone(), config),
            keys: KeyResolver::with_http_client(client, config),
            clock_skew_leeway: config.clock_skew_leeway.as_secs(),
            validate_exp: config.validate_exp,
            validate_nbf: config.validate_nbf,
            span: Span::none(),
        }
    }

    /// Attach all events of this verifier and its components to `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.discovery = self.discovery.with_span(span.clone());
        self.keys = self.keys.with_span(span.clone());
        self.span = span;
        self
    }

    /// The discovery client used by this verifier
    pub fn discovery(&self) -> &DiscoveryClient {
        &self.discovery
    }

    /// The key resolver (and JWKS cache) used by this verifier
    pub fn key_resolver(&self) -> &KeyResolver {
        &self.keys
    }

    /// Verify an ID token
    ///
    /// `issuer` and `client_id` are taken from the token's `iss` and `aud` when
    /// not supplied. In that case the token is only as trustworthy as the
    /// issuer it names; pin both values whenever the caller knows them.
    ///
    /// # Errors
    ///
    /// Returns [`crate::VerifyError`] describing the first stage that failed:
    /// - token is malformed, or `iss`/`aud` cannot be derived
    /// - discovery fails
    /// - no signing key can be resolved
    /// - algorithm, signature, audience, issuer or time-claim checks fail
    pub async fn verify(
        &self,
        token: &str,
        issuer: Option<&str>,
        client_id: Option<&str>,
    ) -> Result<VerifiedClaims> {
        self.verify_inner(token, issuer, client_id)
            .instrument(self.span.clone())
            .await
    }

    async fn verify_inner(
        &self,
        token: &str,
        issuer: Option<&str>,
        client_id: Option<&str>,
    ) -> Result<VerifiedClaims> {
        let unverified = UnverifiedToken::decode(token).map_err(|e| {
            debug!(error = %e, "Failed to decode token");
            e
        })?;

        let issuer = match issuer {
            Some(issuer) => issuer.to_string(),
            None => unverified.claims().issuer()?,
        };
        let client_id = match client_id {
            Some(client_id) => client_id.to_string(),
            None => unverified.claims().audience()?,
        };

        let config = self.discovery.discover(&issuer).await?;
        let signing_key = self.keys.resolve(&config.jwks_uri, token).await?;

        let claims = self.validate(
            token,
            &unverified.header().alg,
            &signing_key,
            &config,
            &issuer,
            &client_id,
        )?;

        debug!(
            issuer = %issuer,
            key_id = signing_key.key_id(),
            algorithm = %unverified.header().alg,
            "ID token verified"
        );

        Ok(VerifiedClaims::new(claims))
    }

    /// Check signature and claims with the resolved key
    fn validate(
        &self,
        token: &str,
        algorithm: &str,
        signing_key: &SigningKey,
        config: &OidcConfiguration,
        issuer: &str,
        client_id: &str,
    ) -> std::result::Result<Map<String, Value>, TokenVerificationError> {
        let allowed = config.signing_algorithms();
        let Some(algorithm) = Algorithm::from_str(algorithm)
            .ok()
            .filter(|alg| allowed.contains(alg))
        else {
            warn!(
                algorithm,
                allowed = ?config.id_token_signing_alg_values_supported,
                "Token algorithm not allowed"
            );
            return Err(TokenVerificationError::AlgorithmNotAllowed {
                algorithm: algorithm.to_string(),
                allowed: config.id_token_signing_alg_values_supported.clone(),
            });
        };

        let mut validation = Validation::new(algorithm);
        validation.set_audience(&[client_id]);
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["iss", "aud"]);
        validation.leeway = self.clock_skew_leeway;
        validation.validate_exp = self.validate_exp;
        validation.validate_nbf = self.validate_nbf;

        let data = decode::<Map<String, Value>>(token, signing_key.decoding_key(), &validation)
            .map_err(|e| {
                warn!(
                    error = %e,
                    issuer,
                    audience = client_id,
                    key_id = signing_key.key_id(),
                    "ID token validation failed"
                );
                TokenVerificationError::Rejected(e)
            })?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{rsa_jwk, sign_rs256};
    use jsonwebtoken::jwk::Jwk;
    use serde_json::json;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    const ISSUER: &str = "https://idp.example";

    fn signing_key() -> SigningKey {
        let jwk: Jwk = serde_json::from_value(rsa_jwk("k1")).unwrap();
        SigningKey::from_jwk(&jwk, "k1").unwrap()
    }

    fn configuration(algorithms: Option<Value>) -> OidcConfiguration {
        let mut doc = json!({"jwks_uri": format!("{ISSUER}/keys")});
        if let Some(algorithms) = algorithms {
            doc["id_token_signing_alg_values_supported"] = algorithms;
        }
        OidcConfiguration::from_slice(&serde_json::to_vec(&doc).unwrap(), "test").unwrap()
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn check(
        verifier: &TokenVerifier,
        token: &str,
        config: &OidcConfiguration,
        client_id: &str,
    ) -> std::result::Result<Map<String, Value>, TokenVerificationError> {
        verifier.validate(token, "RS256", &signing_key(), config, ISSUER, client_id)
    }

    #[test]
    fn test_valid_token_returns_payload() {
        let payload = json!({"iss": ISSUER, "aud": "client-123", "sub": "u1"});
        let token = sign_rs256("k1", &payload);
        let verifier = TokenVerifier::new().unwrap();

        let claims = check(&verifier, &token, &configuration(None), "client-123").unwrap();
        assert_eq!(Value::Object(claims), payload);
    }

    #[test]
    fn test_algorithm_outside_supported_list_rejected() {
        let token = sign_rs256("k1", &json!({"iss": ISSUER, "aud": "client-123"}));
        let verifier = TokenVerifier::new().unwrap();

        let err = check(
            &verifier,
            &token,
            &configuration(Some(json!(["ES256", "PS256"]))),
            "client-123",
        )
        .unwrap_err();
        match err {
            TokenVerificationError::AlgorithmNotAllowed { algorithm, allowed } => {
                assert_eq!(algorithm, "RS256");
                assert_eq!(allowed, vec!["ES256", "PS256"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let verifier = TokenVerifier::new().unwrap();
        let token = sign_rs256("k1", &json!({"iss": ISSUER, "aud": "client-123"}));

        let err = verifier
            .validate(&token, "none", &signing_key(), &configuration(None), ISSUER, "client-123")
            .unwrap_err();
        assert!(matches!(err, TokenVerificationError::AlgorithmNotAllowed { .. }));
    }

    #[test]
    fn test_audience_and_issuer_mismatch_rejected() {
        let verifier = TokenVerifier::new().unwrap();
        let config = configuration(None);

        let token = sign_rs256("k1", &json!({"iss": ISSUER, "aud": "client-123"}));
        let err = check(&verifier, &token, &config, "someone-else").unwrap_err();
        assert!(matches!(err, TokenVerificationError::Rejected(_)));

        let token = sign_rs256("k1", &json!({"iss": "https://evil.example", "aud": "client-123"}));
        let err = check(&verifier, &token, &config, "client-123").unwrap_err();
        assert!(matches!(err, TokenVerificationError::Rejected(_)));
    }

    #[test]
    fn test_audience_array_membership() {
        let verifier = TokenVerifier::new().unwrap();
        let token = sign_rs256(
            "k1",
            &json!({"iss": ISSUER, "aud": ["client-123", "client-456"]}),
        );

        assert!(check(&verifier, &token, &configuration(None), "client-456").is_ok());
    }

    #[test]
    fn test_missing_iss_or_aud_rejected() {
        let verifier = TokenVerifier::new().unwrap();
        let config = configuration(None);

        let token = sign_rs256("k1", &json!({"aud": "client-123"}));
        assert!(check(&verifier, &token, &config, "client-123").is_err());

        let token = sign_rs256("k1", &json!({"iss": ISSUER}));
        assert!(check(&verifier, &token, &config, "client-123").is_err());
    }

    #[test]
    fn test_expired_token_and_leeway() {
        let token = sign_rs256(
            "k1",
            &json!({"iss": ISSUER, "aud": "client-123", "exp": now() - 30}),
        );
        let config = configuration(None);

        let strict = TokenVerifier::new().unwrap();
        let err = check(&strict, &token, &config, "client-123").unwrap_err();
        assert!(err.to_string().contains("token verification failed"));

        let config_with_skew = VerifierConfig::default().with_clock_skew(Duration::from_secs(120));
        let lenient = TokenVerifier::with_config(&config_with_skew).unwrap();
        assert!(check(&lenient, &token, &config, "client-123").is_ok());
    }

    #[test]
    fn test_not_yet_valid_token_rejected() {
        let token = sign_rs256(
            "k1",
            &json!({"iss": ISSUER, "aud": "client-123", "nbf": now() + 3600}),
        );
        let verifier = TokenVerifier::new().unwrap();
        assert!(check(&verifier, &token, &configuration(None), "client-123").is_err());
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let token = sign_rs256("k1", &json!({"iss": ISSUER, "aud": "client-123"}));
        let (signed, signature) = token.rsplit_once('.').unwrap();
        let flipped = if signature.starts_with('A') { "B" } else { "A" };
        let tampered = format!("{signed}.{flipped}{}", &signature[1..]);

        let verifier = TokenVerifier::new().unwrap();
        let err = check(&verifier, &tampered, &configuration(None), "client-123").unwrap_err();
        assert!(matches!(err, TokenVerificationError::Rejected(_)));
    }
}
