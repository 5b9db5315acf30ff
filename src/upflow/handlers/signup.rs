use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::auth::{session, AuthConfig, AuthError};
use crate::upflow::storage::{insert_user, SignupOutcome};
use crate::upflow::types::{ErrorResponse, SignupRequest, UserBody, UserResponse};

use super::{json_error, normalize_email, projects, valid_email, valid_password};

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Account created, session cookie set", body = UserResponse),
        (status = 400, description = "Invalid email or password", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn signup(
    config: Extension<Arc<AuthConfig>>,
    pool: Extension<PgPool>,
    payload: Option<Json<SignupRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return AuthError::Validation("Missing payload.").into_response();
    };

    let email = normalize_email(&request.email);
    if email.is_empty() || !valid_email(&email) {
        return AuthError::Validation("Invalid email.").into_response();
    }
    if !valid_password(&request.password) {
        return AuthError::Validation("Password too short (8 characters minimum).")
            .into_response();
    }

    let password_hash = match crate::auth::password::hash(&request.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let user_id = match insert_user(&pool, &email, &password_hash).await {
        Ok(SignupOutcome::Created(id)) => id,
        Ok(SignupOutcome::Conflict) => {
            return json_error(StatusCode::CONFLICT, "Email already in use.");
        }
        Err(err) => {
            error!("Failed to create user: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // The account exists either way; a missing demo project is recoverable
    // (it can be created from the dashboard), so seeding does not fail signup.
    if let Err(err) = projects::seed_demo_project(&pool, user_id).await {
        error!("Failed to seed demo project: {err}");
    }

    respond_with_session(&config, user_id, &email)
}

/// Shared by signup and login: issue a session and attach the cookie.
pub(super) fn respond_with_session(config: &AuthConfig, user_id: Uuid, email: &str) -> Response {
    let token = match session::issue(config, user_id, email) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to issue session token: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut headers = HeaderMap::new();
    match session::session_cookie(config, &token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let body = UserResponse {
        user: UserBody {
            id: user_id.to_string(),
            email: email.to_string(),
        },
    };
    (StatusCode::OK, headers, Json(body)).into_response()
}
