//! Shared fixtures for unit tests

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};

pub(crate) const RSA_PRIVATE_PEM: &[u8] = include_bytes!("../tests/fixtures/rsa_private.pem");

// Public modulus of tests/fixtures/rsa_private.pem
pub(crate) const RSA_N: &str = "oCks8Tf70ttecXCQopF7sO49L_TN1AmOJwKzvSN6xyeu7pg6fUKeBReR1IEIEljJlxqz3FAsFxtocPhsWFIyBZElFDoSoxx2pyQBLrMeKENdIF6pNjobGRm4IntbFKzIT9ECAbltjP1-O8G0_gUQJ3cPobajb2mG7Wo_zy9i5tSmsAyfLvnyEboDPrMpEbLHB7Bmu8t-t7vFwVwt4izecrsfeBYp3IHkMofpfZnRY4vhPJQ2kBjWIgbWRLlA4gSbB4ETPTk7xr9eCm3456sB3REKaI_Hnn_J8MFgD_ztBiBfye5GsPB2QxmA1CmZiWIhI4jNkRnhOZAsIp5oaF2heQ";

pub(crate) fn rsa_jwk(kid: &str) -> Value {
    json!({"kty": "RSA", "kid": kid, "use": "sig", "alg": "RS256", "n": RSA_N, "e": "AQAB"})
}

pub(crate) fn sign_rs256(kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(RSA_PRIVATE_PEM).expect("fixture key");
    encode(&header, claims, &key).expect("encode test token")
}
