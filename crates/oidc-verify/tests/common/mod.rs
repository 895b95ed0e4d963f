//! Common test utilities for integration tests
//!
//! A wiremock-backed OpenID provider plus fixture keys for signing tokens.

#![allow(dead_code)]

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::time::{SystemTime, UNIX_EPOCH};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
pub const JWKS_PATH: &str = "/jwks";

const RSA_PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/rsa_private.pem");
const RSA_ROTATED_PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/rsa_rotated_private.pem");
const EC_PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/ec_private.pem");

// Public halves of the fixture keys
const RSA_N: &str = "oCks8Tf70ttecXCQopF7sO49L_TN1AmOJwKzvSN6xyeu7pg6fUKeBReR1IEIEljJlxqz3FAsFxtocPhsWFIyBZElFDoSoxx2pyQBLrMeKENdIF6pNjobGRm4IntbFKzIT9ECAbltjP1-O8G0_gUQJ3cPobajb2mG7Wo_zy9i5tSmsAyfLvnyEboDPrMpEbLHB7Bmu8t-t7vFwVwt4izecrsfeBYp3IHkMofpfZnRY4vhPJQ2kBjWIgbWRLlA4gSbB4ETPTk7xr9eCm3456sB3REKaI_Hnn_J8MFgD_ztBiBfye5GsPB2QxmA1CmZiWIhI4jNkRnhOZAsIp5oaF2heQ";
const RSA_ROTATED_N: &str = "sAjoetS1BDF4uoNx25IFaw4knFQpkQ4Ca-mHXsniNbQt9i6MyokYp3mg1OV9nDgR6ztcVnK0U4VoGsZ4UnT3lJtjSoxL9xejf48Xt0cHrIoIdlL_HQAG1qj2RB81inH67zJ9j-zC2M0uq_hmkhzSGOvXcFbqAzdsM974Otuu6r_edIqYMeqaRJKx8zT3xWlvweZKyCLH8dOqTLQiyuTZeAreO7jQyx5EmNsuqZ-xDXt0a9I_pcRBgGTaq6oNKUBfOpaDexrvnxeOO7YWr8b2dTtq1rwrGvVzyGKRa79JsAGuynKAyBwJtkrxPb-jJRuBOFxCBr4n_OkXqMF1S3D4FQ";
const EC_X: &str = "JSY_EdWPUOLd7E9GYngUFfqtAVs2JhkIEBjiMrqF7FE";
const EC_Y: &str = "orP8C3kgwQJxxRXC_rw86XlDAYDauIdijlKLwE0yjWE";

/// Fixture key pairs available for signing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKey {
    Rsa,
    RsaRotated,
    Ec,
}

impl TestKey {
    /// Public JWK for this key under `kid`
    pub fn jwk(self, kid: &str) -> Value {
        match self {
            Self::Rsa => json!({
                "kty": "RSA", "kid": kid, "use": "sig", "alg": "RS256",
                "n": RSA_N, "e": "AQAB",
            }),
            Self::RsaRotated => json!({
                "kty": "RSA", "kid": kid, "use": "sig", "alg": "RS256",
                "n": RSA_ROTATED_N, "e": "AQAB",
            }),
            Self::Ec => json!({
                "kty": "EC", "kid": kid, "use": "sig", "alg": "ES256",
                "crv": "P-256", "x": EC_X, "y": EC_Y,
            }),
        }
    }

    fn algorithm(self) -> Algorithm {
        match self {
            Self::Rsa | Self::RsaRotated => Algorithm::RS256,
            Self::Ec => Algorithm::ES256,
        }
    }

    fn encoding_key(self) -> EncodingKey {
        match self {
            Self::Rsa => EncodingKey::from_rsa_pem(RSA_PRIVATE_PEM),
            Self::RsaRotated => EncodingKey::from_rsa_pem(RSA_ROTATED_PRIVATE_PEM),
            Self::Ec => EncodingKey::from_ec_pem(EC_PRIVATE_PEM),
        }
        .expect("fixture key should parse")
    }

    /// Sign `claims` with this key, advertising `kid` in the header
    pub fn sign(self, kid: &str, claims: &Value) -> String {
        let mut header = Header::new(self.algorithm());
        header.kid = Some(kid.to_string());
        encode(&header, claims, &self.encoding_key()).expect("Failed to encode test token")
    }
}

/// Mock OpenID provider serving discovery and JWKS documents
pub struct MockIssuer {
    pub server: MockServer,
    pub issuer: String,
    pub jwks_uri: String,
}

impl MockIssuer {
    /// Start a new mock provider; nothing is mounted yet
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let issuer = server.uri();
        let jwks_uri = format!("{issuer}{JWKS_PATH}");

        Self {
            server,
            issuer,
            jwks_uri,
        }
    }

    /// Discovery document pointing at this provider's JWKS
    pub fn discovery_document(&self, algorithms: Option<&[&str]>) -> Value {
        let mut doc = json!({
            "issuer": self.issuer,
            "jwks_uri": self.jwks_uri,
            "authorization_endpoint": format!("{}/authorize", self.issuer),
            "response_types_supported": ["code", "id_token"],
        });
        if let Some(algorithms) = algorithms {
            doc["id_token_signing_alg_values_supported"] = json!(algorithms);
        }
        doc
    }

    /// Mount a discovery document advertising `algorithms`
    ///
    /// `None` leaves the field out so the `RS256` default applies.
    pub async fn mock_discovery(&self, algorithms: Option<&[&str]>) {
        self.mock_discovery_body(self.discovery_document(algorithms))
            .await;
    }

    /// Mount an arbitrary discovery document
    pub async fn mock_discovery_body(&self, body: Value) {
        Mock::given(method("GET"))
            .and(path(DISCOVERY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Mount a discovery endpoint answering with `status`
    pub async fn mock_discovery_status(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path(DISCOVERY_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Mount a JWKS endpoint serving `keys`
    pub async fn mock_jwks(&self, keys: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .mount(&self.server)
            .await;
    }

    /// Standard claims for a token issued by this provider
    pub fn claims(&self, audience: Value) -> Value {
        let now = current_timestamp();
        json!({
            "iss": self.issuer,
            "aud": audience,
            "sub": "user-123",
            "iat": now,
            "exp": now + 3600,
        })
    }

    /// Number of requests received on `request_path`
    pub async fn request_count(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == request_path)
            .count()
    }
}

/// Issuer URL on a loopback port with no listener
pub fn closed_issuer() -> String {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    format!("http://127.0.0.1:{port}")
}

/// Get current Unix timestamp
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Install a test subscriber honoring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
