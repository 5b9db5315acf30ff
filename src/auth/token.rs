//! Compact HMAC-signed token codec.
//!
//! Tokens are three dot-joined base64url segments: a header naming the
//! algorithm, a JSON claim set, and an HMAC-SHA-256 signature over
//! `header.payload`. The codec backs login sessions; reset tokens use a
//! separate stored-hash scheme (see [`super::reset`]) because a stateless
//! signed token cannot be made single-use.

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use super::now_unix;

type HmacSha256 = Hmac<Sha256>;

/// Claim set carried by a session token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a claim set into a `header.payload.signature` token.
///
/// # Errors
///
/// Returns an error if serialization or MAC setup fails.
pub fn encode(claims: &Claims, secret: &SecretString) -> Result<String> {
    let header = json!({"alg": "HS256", "typ": "JWT"});
    let encoded_header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
    let encoded_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let data = format!("{encoded_header}.{encoded_payload}");

    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .context("failed to initialize token signer")?;
    mac.update(data.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{data}.{signature}"))
}

/// Validate a token and return its claims.
///
/// Signature verification happens before any payload parsing and uses a
/// constant-time comparison; expiry is enforced independently of signature
/// validity. Every failure mode collapses into `None`.
#[must_use]
pub fn decode(token: &str, secret: &SecretString) -> Option<Claims> {
    let mut parts = token.split('.');
    let (header, payload, signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
    let data = format!("{header}.{payload}");

    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()).ok()?;
    mac.update(data.as_bytes());
    // verify_slice is constant time.
    mac.verify_slice(&signature).ok()?;

    let payload = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: Claims = serde_json::from_slice(&payload).ok()?;

    if claims.exp < now_unix() {
        return None;
    }

    Some(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("signing-secret".to_string())
    }

    fn claims(exp_offset: i64) -> Claims {
        let now = now_unix();
        Claims {
            sub: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            iat: now,
            exp: now + exp_offset,
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let claims = claims(3600);
        let token = encode(&claims, &secret()).expect("encode should succeed");
        assert_eq!(decode(&token, &secret()), Some(claims));
    }

    #[test]
    fn wrong_secret_yields_none() {
        let token = encode(&claims(3600), &secret()).expect("encode should succeed");
        let other = SecretString::from("other-secret".to_string());
        assert_eq!(decode(&token, &other), None);
    }

    #[test]
    fn expiry_is_enforced_independently_of_signature() {
        // One second in the past: valid signature, still rejected.
        let expired = encode(&claims(-1), &secret()).expect("encode should succeed");
        assert_eq!(decode(&expired, &secret()), None);

        // One second in the future: accepted.
        let fresh = claims(1);
        let token = encode(&fresh, &secret()).expect("encode should succeed");
        assert_eq!(decode(&token, &secret()), Some(fresh));
    }

    #[test]
    fn tampered_payload_is_rejected_before_parsing() {
        let token = encode(&claims(3600), &secret()).expect("encode should succeed");
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = URL_SAFE_NO_PAD.encode(b"{\"sub\":\"x\"}");
        parts[1] = &forged_payload;
        let forged = parts.join(".");
        assert_eq!(decode(&forged, &secret()), None);
    }

    #[test]
    fn malformed_shapes_yield_none() {
        assert_eq!(decode("", &secret()), None);
        assert_eq!(decode("a.b", &secret()), None);
        assert_eq!(decode("a.b.c.d", &secret()), None);
        assert_eq!(decode("not base64!.a.b", &secret()), None);
    }
}
