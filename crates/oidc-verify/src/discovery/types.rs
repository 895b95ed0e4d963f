//! # Discovery Document Types

use std::str::FromStr;

use jsonwebtoken::Algorithm;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::http::FetchError;

/// Path appended to the issuer to locate its configuration
pub const WELL_KNOWN_PATH: &str = "/.well-known/openid-configuration";

/// Algorithm assumed when the configuration does not list any
pub const DEFAULT_SIGNING_ALGORITHM: &str = "RS256";

/// Discovery errors
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The configuration document could not be fetched
    #[error("unable to retrieve OIDC configuration from '{url}': {source}")]
    Fetch {
        /// Discovery URL
        url: String,
        /// Underlying fetch failure
        #[source]
        source: FetchError,
    },

    /// The body is not a JSON object
    #[error("invalid OIDC configuration from '{url}': {message}")]
    InvalidJson {
        /// Discovery URL
        url: String,
        /// Parser message
        message: String,
    },

    /// `jwks_uri` absent, empty or not a string
    #[error("missing 'jwks_uri' in OIDC configuration from '{url}'")]
    MissingJwksUri {
        /// Discovery URL
        url: String,
    },

    /// `id_token_signing_alg_values_supported` present but empty
    #[error("the OIDC configuration from '{url}' contains an empty list of supported signing algorithms")]
    EmptyAlgorithms {
        /// Discovery URL
        url: String,
    },

    /// A field has the wrong type
    #[error("invalid field value for {field} in OIDC configuration from '{url}': {reason}")]
    InvalidField {
        /// Discovery URL
        url: String,
        /// Field name
        field: String,
        /// What was wrong
        reason: String,
    },
}

/// The subset of an OpenID Provider configuration used for verification
#[derive(Debug, Clone, PartialEq)]
pub struct OidcConfiguration {
    /// `issuer` as advertised by the document, if any
    pub issuer: Option<String>,

    /// URL of the issuer's JWK Set
    pub jwks_uri: String,

    /// Signing algorithms in document order, or `["RS256"]` when not advertised
    pub id_token_signing_alg_values_supported: Vec<String>,
}

impl OidcConfiguration {
    /// Parse and validate a configuration document
    ///
    /// `url` is used only for error messages.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] if the body is not a JSON object, `jwks_uri`
    /// is missing or empty, or the algorithm list is empty or mistyped.
    pub fn from_slice(body: &[u8], url: &str) -> Result<Self, DiscoveryError> {
        let document: Map<String, Value> =
            serde_json::from_slice(body).map_err(|e| DiscoveryError::InvalidJson {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let jwks_uri = match document.get("jwks_uri") {
            Some(Value::String(uri)) if !uri.is_empty() => uri.clone(),
            _ => {
                return Err(DiscoveryError::MissingJwksUri {
                    url: url.to_string(),
                });
            }
        };

        let algorithms = match document.get("id_token_signing_alg_values_supported") {
            None => vec![DEFAULT_SIGNING_ALGORITHM.to_string()],
            Some(Value::Null) => {
                return Err(DiscoveryError::EmptyAlgorithms {
                    url: url.to_string(),
                });
            }
            Some(Value::Array(values)) if values.is_empty() => {
                return Err(DiscoveryError::EmptyAlgorithms {
                    url: url.to_string(),
                });
            }
            Some(Value::Array(values)) => values
                .iter()
                .map(|value| {
                    value
                        .as_str()
                        .map(str::to_string)
                        .ok_or_else(|| DiscoveryError::InvalidField {
                            url: url.to_string(),
                            field: "id_token_signing_alg_values_supported".to_string(),
                            reason: format!("expected string, found {value}"),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(DiscoveryError::InvalidField {
                    url: url.to_string(),
                    field: "id_token_signing_alg_values_supported".to_string(),
                    reason: format!("expected array, found {other}"),
                });
            }
        };

        let issuer = document
            .get("issuer")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            issuer,
            jwks_uri,
            id_token_signing_alg_values_supported: algorithms,
        })
    }

    /// Advertised algorithms that the signature primitive implements
    ///
    /// Names it does not recognize (including `none`) are dropped.
    pub fn signing_algorithms(&self) -> Vec<Algorithm> {
        self.id_token_signing_alg_values_supported
            .iter()
            .filter_map(|name| Algorithm::from_str(name).ok())
            .collect()
    }
}
