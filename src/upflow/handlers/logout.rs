use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::auth::{session, AuthConfig};

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session cookie cleared")
    ),
    tag = "auth"
)]
pub async fn logout(config: Extension<Arc<AuthConfig>>) -> Response {
    // Stateless sessions: "logout" is clearing the cookie. The token itself
    // stays valid until its natural expiry.
    let mut headers = HeaderMap::new();
    if let Ok(cookie) = session::clear_session_cookie(&config) {
        headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, headers).into_response()
}
