//! Claim sets before and after verification
//!
//! [`UnverifiedClaims`] and [`VerifiedClaims`] hold the same kind of data but are
//! unrelated types. Only the verifier can build a `VerifiedClaims`.
//!
//! # Trust boundary
//!
//! When the caller does not supply an issuer or client ID, they are derived from
//! the unverified token. Signature, issuer and audience are then all checked
//! against those same values.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while decoding a token or deriving values from its claims
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimsError {
    /// Token is not a decodable header/payload/signature structure
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Issuer was not supplied and could not be read from `iss`
    #[error("unable to retrieve issuer from token: {0}")]
    MissingIssuer(String),

    /// Client ID was not supplied and `aud` does not name exactly one audience
    #[error("unable to retrieve client ID from token: {0}")]
    MissingAudience(String),
}

/// Claims decoded without signature verification
///
/// Neither `Serialize` nor convertible into [`VerifiedClaims`].
#[derive(Debug, Clone, PartialEq)]
pub struct UnverifiedClaims {
    claims: Map<String, Value>,
}

impl UnverifiedClaims {
    pub(crate) fn new(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    /// Look up a raw claim
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Derive the issuer from `iss`
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsError::MissingIssuer`] if `iss` is absent or not a string.
    pub fn issuer(&self) -> Result<String, ClaimsError> {
        match self.claims.get("iss") {
            Some(Value::String(iss)) => Ok(iss.clone()),
            Some(other) => Err(ClaimsError::MissingIssuer(format!(
                "'iss' claim is not a string: {other}"
            ))),
            None => Err(ClaimsError::MissingIssuer(
                "'iss' claim not present".to_string(),
            )),
        }
    }

    /// Derive the client ID from `aud`
    ///
    /// A string audience is used as-is. An array must hold exactly one string.
    /// Tokens naming several audiences are rejected outright rather than
    /// matched against a trust list.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsError::MissingAudience`] if `aud` is absent, is an array
    /// whose length is not one, or holds a non-string value.
    pub fn audience(&self) -> Result<String, ClaimsError> {
        match self.claims.get("aud") {
            Some(Value::String(aud)) => Ok(aud.clone()),
            Some(Value::Array(values)) => match values.as_slice() {
                [Value::String(aud)] => Ok(aud.clone()),
                [other] => Err(ClaimsError::MissingAudience(format!(
                    "'aud' element is not a string: {other}"
                ))),
                _ => Err(ClaimsError::MissingAudience(format!(
                    "expected exactly one audience, found {}",
                    values.len()
                ))),
            },
            Some(other) => Err(ClaimsError::MissingAudience(format!(
                "'aud' claim is not a string or array: {other}"
            ))),
            None => Err(ClaimsError::MissingAudience(
                "'aud' claim not present".to_string(),
            )),
        }
    }
}

/// Claims whose signature, issuer and audience have been verified
///
/// Serializes as the original token payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VerifiedClaims {
    claims: Map<String, Value>,
}

impl VerifiedClaims {
    pub(crate) fn new(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    /// Look up a claim
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// The verified `iss` claim
    pub fn issuer(&self) -> Option<&str> {
        self.claims.get("iss").and_then(Value::as_str)
    }

    /// The `sub` claim, if present and a string
    pub fn subject(&self) -> Option<&str> {
        self.claims.get("sub").and_then(Value::as_str)
    }

    /// All audiences named by `aud`
    pub fn audience(&self) -> Vec<&str> {
        match self.claims.get("aud") {
            Some(Value::String(aud)) => vec![aud.as_str()],
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Borrow the full claim map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Take ownership of the full claim map
    pub fn into_map(self) -> Map<String, Value> {
        self.claims
    }
}

/// Decode a token's payload without checking its signature
///
/// # Errors
///
/// Returns [`ClaimsError::Malformed`] if the token is structurally invalid.
pub fn extract_unverified_claims(token: &str) -> Result<UnverifiedClaims, ClaimsError> {
    crate::token::UnverifiedToken::decode(token).map(|decoded| decoded.claims().clone())
}
