use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::auth::{password, AuthConfig, AuthError};
use crate::upflow::storage::{lookup_user_by_id, update_password};
use crate::upflow::types::{ChangePasswordRequest, ErrorResponse, UserResponse};

use super::{json_error, session_claims, signup::respond_with_session, valid_password};
use axum::Json;

#[utoipa::path(
    patch,
    path = "/api/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed, session re-issued", body = UserResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "No session or wrong current password", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn change_password(
    config: Extension<Arc<AuthConfig>>,
    pool: Extension<PgPool>,
    headers: HeaderMap,
    payload: Option<Json<ChangePasswordRequest>>,
) -> Response {
    let Some(claims) = session_claims(&config, &headers) else {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthorized.");
    };

    let Some(Json(request)) = payload else {
        return AuthError::Validation("Missing payload.").into_response();
    };
    if request.current_password.is_empty() || request.next_password.is_empty() {
        return AuthError::Validation("Missing required fields.").into_response();
    }
    if !valid_password(&request.next_password) {
        return AuthError::Validation("Password too short (8 characters minimum).")
            .into_response();
    }

    let user = match lookup_user_by_id(&pool, claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "User not found."),
        Err(err) => {
            error!("Failed to lookup user: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if !password::verify(&request.current_password, &user.password_hash) {
        return json_error(StatusCode::UNAUTHORIZED, "Current password incorrect.");
    }

    let new_hash = match password::hash(&request.next_password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Err(err) = update_password(&pool, user.id, &new_hash).await {
        error!("Failed to update password: {err}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    // Re-issue the session so the cookie lifetime restarts with the change.
    respond_with_session(&config, user.id, &user.email)
}
