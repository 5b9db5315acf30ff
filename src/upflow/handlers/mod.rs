pub mod health;
pub use self::health::health;

pub mod account;
pub mod forgot;
pub mod login;
pub mod logout;
pub mod me;
pub mod password;
pub mod profile;
pub mod projects;
pub mod reset;
pub mod signup;
pub mod widget;

// common functions for the handlers

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde_json::json;

use crate::auth::{session, token::Claims, AuthConfig, AuthError};

pub(crate) const MIN_PASSWORD_CHARS: usize = 8;

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

pub(crate) fn valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_CHARS
}

/// Resolve the caller's session from request headers.
///
/// Missing cookie, bad signature, and expiry all come back as `None`; no
/// handler may distinguish those cases in its response.
pub(crate) fn session_claims(config: &AuthConfig, headers: &HeaderMap) -> Option<Claims> {
    session::session_from_headers(config, headers)
}

pub(crate) fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Authentication => StatusCode::UNAUTHORIZED,
            AuthError::Authorization => StatusCode::FORBIDDEN,
        };
        json_error(status, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn valid_password_enforces_minimum_length() {
        assert!(!valid_password("short"));
        assert!(!valid_password("1234567"));
        assert!(valid_password("12345678"));
    }

    #[test]
    fn auth_error_maps_to_statuses() {
        assert_eq!(
            AuthError::Validation("Invalid email.")
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::Authentication.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Authorization.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
