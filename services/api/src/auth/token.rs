//! services/api/src/auth/token.rs
//!
//! Compact signed bearer tokens: a base64url-encoded header and payload with
//! an HMAC-SHA256 MAC over `header.payload`. Verification recomputes the MAC
//! in constant time and returns `None` on any mismatch or malformed structure
//! rather than an error.
//!
//! Tokens carry no expiry; callers must never trust claims without a
//! successful `verify`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// The claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated user's id.
    pub sub: String,
    /// Unix seconds at issuance. Recorded for auditing; not checked.
    pub iat: i64,
}

fn mac_for(signing_input: &str, secret: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(signing_input.as_bytes());
    mac
}

/// Issues a signed token for the given claims.
pub fn sign(claims: &Claims, secret: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).expect("claims always serialize"));

    let signing_input = format!("{header}.{payload}");
    let sig = URL_SAFE_NO_PAD.encode(mac_for(&signing_input, secret).finalize().into_bytes());

    format!("{signing_input}.{sig}")
}

/// Verifies a token and returns its claims, or `None` if the token is
/// malformed, tampered with, or signed with a different secret.
pub fn verify(token: &str, secret: &str) -> Option<Claims> {
    let mut parts = token.split('.');
    let (header, payload, sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let given = URL_SAFE_NO_PAD.decode(sig).ok()?;
    let expected = mac_for(&format!("{header}.{payload}"), secret)
        .finalize()
        .into_bytes();
    if expected.ct_eq(given.as_slice()).unwrap_u8() != 1 {
        return None;
    }

    let payload = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&payload).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> Claims {
        Claims {
            sub: "user-1".to_string(),
            iat: 1_700_000_000,
        }
    }

    #[test]
    fn round_trip_returns_equal_claims() {
        let token = sign(&claims(), "secret");
        assert_eq!(verify(&token, "secret"), Some(claims()));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign(&claims(), "secret");
        assert_eq!(verify(&token, "other-secret"), None);
    }

    #[test]
    fn truncated_token_is_rejected() {
        let token = sign(&claims(), "secret");
        let truncated = &token[..token.len() - 4];
        assert_eq!(verify(truncated, "secret"), None);
        assert_eq!(verify("a.b", "secret"), None);
        assert_eq!(verify("", "secret"), None);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = sign(&claims(), "secret");
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(r#"{"sub":"user-2","iat":1700000000}"#);
        parts[1] = &forged;
        assert_eq!(verify(&parts.join("."), "secret"), None);
    }
}
