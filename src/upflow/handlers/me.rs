use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::auth::AuthConfig;
use crate::upflow::storage::lookup_user_by_id;
use crate::upflow::types::{ErrorResponse, UserBody, UserResponse};

use super::{json_error, session_claims};

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "No valid session", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn me(
    config: Extension<Arc<AuthConfig>>,
    pool: Extension<PgPool>,
    headers: HeaderMap,
) -> Response {
    // Missing cookie, invalid token, and deleted user all answer the same.
    let Some(claims) = session_claims(&config, &headers) else {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthorized.");
    };

    let user = match lookup_user_by_id(&pool, claims.sub).await {
        Ok(user) => user,
        Err(err) => {
            error!("Failed to lookup user: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let Some(user) = user else {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthorized.");
    };

    let body = UserResponse {
        user: UserBody {
            id: user.id.to_string(),
            email: user.email,
        },
    };
    (StatusCode::OK, Json(body)).into_response()
}
