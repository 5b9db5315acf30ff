//! Login sessions: token issue/resolve and the cookie contract.
//!
//! Sessions are stateless signed tokens; there is no server-side store, so
//! revocation before natural expiry is impossible by design. Rotating the
//! signing secret invalidates every outstanding session at once.

use anyhow::Result;
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use uuid::Uuid;

use super::token::{self, Claims};
use super::{now_unix, AuthConfig};

pub const SESSION_COOKIE_NAME: &str = "upflow_session";

/// Issue a signed session token for a logged-in user.
///
/// # Errors
///
/// Returns an error if signing fails.
pub fn issue(config: &AuthConfig, user_id: Uuid, email: &str) -> Result<String> {
    let now = now_unix();
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        iat: now,
        exp: now + config.session_ttl_seconds(),
    };
    token::encode(&claims, config.auth_secret())
}

/// Resolve a presented token into claims.
///
/// Decode failure and expiry both produce `None`; callers cannot distinguish
/// "missing" from "invalid".
#[must_use]
pub fn resolve(config: &AuthConfig, token: &str) -> Option<Claims> {
    token::decode(token, config.auth_secret())
}

/// Resolve the session cookie from request headers, if any.
#[must_use]
pub fn session_from_headers(config: &AuthConfig, headers: &HeaderMap) -> Option<Claims> {
    let token = extract_session_token(headers)?;
    resolve(config, &token)
}

/// Build the `Set-Cookie` value for a session token.
///
/// # Errors
///
/// Returns an error if the token produces an invalid header value.
pub fn session_cookie(config: &AuthConfig, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Build the `Set-Cookie` value that clears the session cookie.
///
/// # Errors
///
/// Returns an error if the header value is invalid.
pub fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}
