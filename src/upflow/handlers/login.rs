use axum::{extract::Extension, response::Response, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::auth::{password, AuthConfig, AuthError};
use crate::upflow::storage::lookup_user_by_email;
use crate::upflow::types::{ErrorResponse, LoginRequest, UserResponse};

use super::{normalize_email, signup::respond_with_session};
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = UserResponse),
        (status = 400, description = "Missing email or password", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    config: Extension<Arc<AuthConfig>>,
    pool: Extension<PgPool>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return AuthError::Validation("Missing payload.").into_response();
    };

    let email = normalize_email(&request.email);
    if email.is_empty() || request.password.is_empty() {
        return AuthError::Validation("Missing email or password.").into_response();
    }

    let user = match lookup_user_by_email(&pool, &email).await {
        Ok(user) => user,
        Err(err) => {
            error!("Failed to lookup user: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // Unknown email and wrong password are indistinguishable to the caller.
    let Some(user) = user else {
        return AuthError::Authentication.into_response();
    };
    if !password::verify(&request.password, &user.password_hash) {
        return AuthError::Authentication.into_response();
    }

    respond_with_session(&config, user.id, &user.email)
}
