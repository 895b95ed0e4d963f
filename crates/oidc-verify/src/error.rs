//! Error taxonomy for ID token verification
//!
//! Each verification stage has its own error type carrying the cause that
//! stopped it. [`VerifyError`] wraps them for the top-level entry point, and
//! [`VerifyError::kind`] flattens the result into one of six terminal kinds.
//!
//! ```text
//! ClaimsError ─────────────┐
//! DiscoveryError ──────────┤
//! KeyResolutionError ──────┼──► VerifyError ──► ErrorKind
//! TokenVerificationError ──┘
//! ```

use thiserror::Error;

use crate::claims::ClaimsError;
use crate::discovery::DiscoveryError;
use crate::jwt::{KeyResolutionError, TokenVerificationError};

/// Result type for verification operations
pub type Result<T, E = VerifyError> = std::result::Result<T, E>;

/// Failure of a single verification attempt
///
/// Every variant is terminal for the token being verified and recoverable for
/// the hosting process. The `Display` output always contains the underlying
/// cause, so callers never need to walk `source()` for a usable message.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The token could not be decoded, or issuer/audience could not be derived from it
    #[error(transparent)]
    Claims(#[from] ClaimsError),

    /// The issuer's OpenID configuration could not be obtained
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// No usable signing key could be obtained from the issuer's JWKS
    #[error(transparent)]
    KeyResolution(#[from] KeyResolutionError),

    /// Signature, algorithm, audience, issuer or time-claim checks failed
    #[error(transparent)]
    TokenVerification(#[from] TokenVerificationError),
}

/// Flat classification of a [`VerifyError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Token cannot be decoded into header and payload
    MalformedToken,
    /// Issuer not supplied and absent from the token
    MissingIssuer,
    /// Client ID not supplied and `aud` absent or multi-valued
    MissingAudience,
    /// Discovery document fetch or validation failed
    Discovery,
    /// JWKS fetch, parse or key selection failed
    KeyResolution,
    /// Final cryptographic or claim verification failed
    TokenVerification,
}

impl VerifyError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Claims(ClaimsError::Malformed(_)) => ErrorKind::MalformedToken,
            Self::Claims(ClaimsError::MissingIssuer(_)) => ErrorKind::MissingIssuer,
            Self::Claims(ClaimsError::MissingAudience(_)) => ErrorKind::MissingAudience,
            Self::Discovery(_) => ErrorKind::Discovery,
            Self::KeyResolution(_) => ErrorKind::KeyResolution,
            Self::TokenVerification(_) => ErrorKind::TokenVerification,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MalformedToken => "malformed token",
            Self::MissingIssuer => "missing issuer",
            Self::MissingAudience => "missing audience",
            Self::Discovery => "discovery",
            Self::KeyResolution => "key resolution",
            Self::TokenVerification => "token verification",
        };
        f.write_str(name)
    }
}
