//! Credential and token primitives.
//!
//! Everything here is a pure function over its inputs plus the process-wide
//! [`AuthConfig`], which is built once at startup and passed by reference.
//! Nothing in this module knows about HTTP routing or storage.

use secrecy::SecretString;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub mod password;
pub mod reset;
pub mod session;
pub mod token;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_RESET_TTL_SECONDS: i64 = 30 * 60;

/// Request-facing failure taxonomy.
///
/// Configuration errors (missing signing secret) are not represented here:
/// they fail startup in the CLI layer and never reach a request path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Malformed input, surfaced with a generic caller-visible message.
    #[error("{0}")]
    Validation(&'static str),
    /// Bad credentials or an invalid/expired token. Always surfaced
    /// uniformly; callers must not learn which check failed.
    #[error("Invalid credentials.")]
    Authentication,
    /// Known caller without sufficient rights.
    #[error("Access denied.")]
    Authorization,
}

/// Process-wide auth configuration, read-only after startup.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    public_url: String,
    auth_secret: SecretString,
    session_ttl_seconds: i64,
    reset_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(public_url: String, auth_secret: SecretString) -> Self {
        Self {
            public_url,
            auth_secret,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            reset_ttl_seconds: DEFAULT_RESET_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_ttl_seconds = seconds;
        self
    }

    /// The origin the dashboard is served from; also the API's own origin for
    /// the admin same-origin check.
    #[must_use]
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    pub(crate) fn auth_secret(&self) -> &SecretString {
        &self.auth_secret
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn reset_ttl_seconds(&self) -> i64 {
        self.reset_ttl_seconds
    }

    /// Only mark cookies secure when the dashboard is served over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.public_url.starts_with("https://")
    }
}

/// Current Unix epoch in seconds.
#[must_use]
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as i64)
}

/// Constant-time byte comparison to prevent timing attacks.
///
/// Length mismatch is a non-match without branching on content.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new(
            "https://app.upflow.dev".to_string(),
            SecretString::from("test-secret".to_string()),
        )
    }

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = config();
        assert_eq!(config.public_url(), "https://app.upflow.dev");
        assert_eq!(config.session_ttl_seconds(), DEFAULT_SESSION_TTL_SECONDS);
        assert_eq!(config.reset_ttl_seconds(), DEFAULT_RESET_TTL_SECONDS);
        assert!(config.session_cookie_secure());

        let config = config
            .with_session_ttl_seconds(3600)
            .with_reset_ttl_seconds(60);
        assert_eq!(config.session_ttl_seconds(), 3600);
        assert_eq!(config.reset_ttl_seconds(), 60);
    }

    #[test]
    fn cookie_not_secure_over_http() {
        let config = AuthConfig::new(
            "http://localhost:8080".to_string(),
            SecretString::from("test-secret".to_string()),
        );
        assert!(!config.session_cookie_secure());
    }

    #[test]
    fn constant_time_eq_works() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn auth_error_messages_stay_generic() {
        assert_eq!(AuthError::Authentication.to_string(), "Invalid credentials.");
        assert_eq!(AuthError::Authorization.to_string(), "Access denied.");
        assert_eq!(
            AuthError::Validation("Invalid email.").to_string(),
            "Invalid email."
        );
    }
}
