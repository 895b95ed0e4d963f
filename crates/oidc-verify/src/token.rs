//! Structural decoding of compact-serialized tokens
//!
//! Nothing in this module checks a signature. It only establishes that a token
//! has the `header.payload.signature` shape and that header and payload are JSON
//! objects, so the verifier can read `iss`, `aud`, `kid` and `alg` before it
//! knows which key to trust.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::claims::{ClaimsError, UnverifiedClaims};

/// JOSE header read without verification
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UnverifiedHeader {
    /// Declared signing algorithm (e.g. `RS256`), possibly one we do not support
    pub alg: String,

    /// Key ID selecting the JWKS entry
    #[serde(default)]
    pub kid: Option<String>,

    /// Remaining header members
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl UnverifiedHeader {
    /// Decode only the header segment of a token
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsError::Malformed`] if the token does not have three
    /// segments or the header is not a base64url JSON object with a string `alg`.
    pub fn decode(token: &str) -> Result<Self, ClaimsError> {
        let (header, _, _) = split_segments(token)?;
        decode_header_segment(header)
    }
}

/// A token whose header and payload have been decoded but not verified
#[derive(Debug, Clone)]
pub struct UnverifiedToken {
    header: UnverifiedHeader,
    claims: UnverifiedClaims,
}

impl UnverifiedToken {
    /// Decode header and payload of a compact-serialized token
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsError::Malformed`] if the token is not three base64url
    /// segments, or if header or payload is not a JSON object.
    pub fn decode(token: &str) -> Result<Self, ClaimsError> {
        let (header, payload, signature) = split_segments(token)?;

        let header = decode_header_segment(header)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| ClaimsError::Malformed(format!("invalid payload encoding: {e}")))?;
        let claims: Map<String, Value> = serde_json::from_slice(&payload)
            .map_err(|e| ClaimsError::Malformed(format!("payload is not a JSON object: {e}")))?;

        URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| ClaimsError::Malformed(format!("invalid signature encoding: {e}")))?;

        Ok(Self {
            header,
            claims: UnverifiedClaims::new(claims),
        })
    }

    /// The decoded header
    pub fn header(&self) -> &UnverifiedHeader {
        &self.header
    }

    /// The decoded, untrusted claims
    pub fn claims(&self) -> &UnverifiedClaims {
        &self.claims
    }
}

fn split_segments(token: &str) -> Result<(&str, &str, &str), ClaimsError> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None) => Ok((header, payload, signature)),
        _ => Err(ClaimsError::Malformed(
            "expected three dot-separated segments".to_string(),
        )),
    }
}

fn decode_header_segment(segment: &str) -> Result<UnverifiedHeader, ClaimsError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| ClaimsError::Malformed(format!("invalid header encoding: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ClaimsError::Malformed(format!("invalid header: {e}")))
}
