use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use tracing::error;

use crate::auth::{now_unix, password, reset, AuthError};
use crate::upflow::storage::consume_reset_token;
use crate::upflow::types::{ErrorResponse, OkResponse, ResetPasswordRequest};

use super::{json_error, valid_password};

#[utoipa::path(
    post,
    path = "/api/auth/reset",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = OkResponse),
        (status = 400, description = "Missing fields or expired/invalid link", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn reset(
    pool: Extension<PgPool>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return AuthError::Validation("Missing payload.").into_response();
    };
    if request.token.is_empty() || request.password.is_empty() {
        return AuthError::Validation("Missing required fields.").into_response();
    }
    if !valid_password(&request.password) {
        return AuthError::Validation("Password too short (8 characters minimum).")
            .into_response();
    }

    let new_hash = match password::hash(&request.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // Hash match, expiry check, password swap, and token clear are one
    // conditional update; a consumed or expired token answers the same way.
    let token_hash = reset::hash_reset_token(&request.token);
    match consume_reset_token(&pool, &token_hash, now_unix(), &new_hash).await {
        Ok(true) => (StatusCode::OK, Json(OkResponse { ok: true })).into_response(),
        Ok(false) => json_error(StatusCode::BAD_REQUEST, "Link expired or invalid."),
        Err(err) => {
            error!("Failed to consume reset token: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
