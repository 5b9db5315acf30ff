use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::auth::{now_unix, reset, AuthConfig, AuthError};
use crate::upflow::email::{build_reset_url, EmailSender};
use crate::upflow::storage::{lookup_user_by_email, set_reset_token};
use crate::upflow::types::{ErrorResponse, ForgotPasswordRequest, OkResponse};

use super::{normalize_email, valid_email};

#[utoipa::path(
    post,
    path = "/api/auth/forgot",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Accepted whether or not the account exists", body = OkResponse),
        (status = 400, description = "Invalid email", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn forgot(
    config: Extension<Arc<AuthConfig>>,
    pool: Extension<PgPool>,
    email_sender: Extension<Arc<dyn EmailSender>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return AuthError::Validation("Missing payload.").into_response();
    };

    let email = normalize_email(&request.email);
    if email.is_empty() || !valid_email(&email) {
        return AuthError::Validation("Invalid email.").into_response();
    }

    let user = match lookup_user_by_email(&pool, &email).await {
        Ok(user) => user,
        Err(err) => {
            error!("Failed to lookup user: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // The response is identical either way; only the email reveals anything,
    // and only to the mailbox owner.
    if let Some(user) = user {
        let token = match reset::generate_reset_token() {
            Ok(token) => token,
            Err(err) => {
                error!("Failed to generate reset token: {err}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        let token_hash = reset::hash_reset_token(&token);
        let expires_at = now_unix() + config.reset_ttl_seconds();

        // Overwrites any pending reset; the previous link stops matching.
        if let Err(err) = set_reset_token(&pool, user.id, &token_hash, expires_at).await {
            error!("Failed to store reset token: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }

        let reset_url = build_reset_url(config.public_url(), &token);
        email_sender.send_password_reset(&user.email, &reset_url);
    }

    (StatusCode::OK, Json(OkResponse { ok: true })).into_response()
}
