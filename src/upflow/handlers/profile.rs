use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::auth::{AuthConfig, AuthError};
use crate::upflow::storage::{update_email, UpdateEmailOutcome};
use crate::upflow::types::{ErrorResponse, UpdateProfileRequest, UserBody, UserResponse};

use super::{json_error, normalize_email, session_claims, valid_email};

#[utoipa::path(
    patch,
    path = "/api/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Email changed", body = UserResponse),
        (status = 400, description = "Invalid email", body = ErrorResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn update_profile(
    config: Extension<Arc<AuthConfig>>,
    pool: Extension<PgPool>,
    headers: HeaderMap,
    payload: Option<Json<UpdateProfileRequest>>,
) -> Response {
    let Some(claims) = session_claims(&config, &headers) else {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthorized.");
    };
    let Some(Json(request)) = payload else {
        return AuthError::Validation("Missing payload.").into_response();
    };

    let email = normalize_email(&request.email);
    if email.is_empty() || !valid_email(&email) {
        return AuthError::Validation("Invalid email.").into_response();
    }

    // The unique index arbitrates the "already used" case; no pre-check, so
    // two racing changes cannot both win.
    let outcome = match update_email(&pool, claims.sub, &email).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("Failed to update email: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match outcome {
        UpdateEmailOutcome::Updated(user) => {
            let body = UserResponse {
                user: UserBody {
                    id: user.id.to_string(),
                    email: user.email,
                },
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        UpdateEmailOutcome::Conflict => json_error(StatusCode::CONFLICT, "Email already in use."),
        UpdateEmailOutcome::NotFound => json_error(StatusCode::NOT_FOUND, "User not found."),
    }
}
