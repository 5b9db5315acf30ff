use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::auth::{session, AuthConfig};
use crate::upflow::storage::{delete_account, lookup_user_by_id};
use crate::upflow::types::{ErrorResponse, OkResponse};

use super::{json_error, session_claims};

#[utoipa::path(
    delete,
    path = "/api/auth/account",
    responses(
        (status = 200, description = "Account deleted, cookie cleared", body = OkResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn delete(
    config: Extension<Arc<AuthConfig>>,
    pool: Extension<PgPool>,
    headers: HeaderMap,
) -> Response {
    let Some(claims) = session_claims(&config, &headers) else {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthorized.");
    };

    match lookup_user_by_id(&pool, claims.sub).await {
        Ok(Some(_)) => {}
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "User not found."),
        Err(err) => {
            error!("Failed to lookup user: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    if let Err(err) = delete_account(&pool, claims.sub).await {
        error!("Failed to delete account: {err}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = session::clear_session_cookie(&config) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (
        StatusCode::OK,
        response_headers,
        Json(OkResponse { ok: true }),
    )
        .into_response()
}
