//! JWT verification - key resolution and the verification pipeline
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              TokenVerifier               │
//! │  decode → discover → resolve → validate  │
//! └──────────────────────────────────────────┘
//!        │                │
//!        ▼                ▼
//! ┌──────────────┐  ┌───────────────────────┐
//! │  Discovery   │  │      KeyResolver      │
//! │    Client    │  │  JWKS fetch + cache   │
//! └──────────────┘  └───────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `jwks` - JWKS fetching, caching and key selection
//! - `verifier` - Orchestration and final signature/claim validation

pub mod jwks;
pub mod verifier;

pub use jwks::{CacheStats, KeyResolutionError, KeyResolver, SigningKey};
pub use verifier::{TokenVerificationError, TokenVerifier};
