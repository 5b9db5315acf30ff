use axum::{
    extract::{Extension, Query},
    http::{
        header::{ORIGIN, REFERER},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::access::{verify_project_access, AccessContext, Decision, Denial};
use crate::auth::{now_unix, AuthConfig};
use crate::upflow::storage::{latest_widget_ping, record_widget_ping};
use crate::upflow::types::{
    ErrorResponse, OkResponse, WidgetPingRequest, WidgetStatusQuery, WidgetStatusResponse,
};

use super::{json_error, session_claims};

const DEFAULT_PROJECT_ID: &str = "default";
const STALE_WINDOW_SECONDS: i64 = 45;

/// Marker header the dashboard sends on its own backend calls. Only honored
/// together with a valid session and same-origin proof.
const ADMIN_HEADER: &str = "x-upflow-admin";

fn header_string(
    headers: &HeaderMap,
    name: impl axum::http::header::AsHeaderName,
) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn denial_response(denial: &Denial) -> Response {
    let status = StatusCode::from_u16(denial.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    json_error(status, denial.message)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[utoipa::path(
    post,
    path = "/api/widget/ping",
    request_body = WidgetPingRequest,
    responses(
        (status = 200, description = "Heartbeat recorded", body = OkResponse),
        (status = 401, description = "No credential supplied", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 404, description = "Unknown project", body = ErrorResponse)
    ),
    tag = "widget"
)]
pub async fn ping(
    config: Extension<Arc<AuthConfig>>,
    pool: Extension<PgPool>,
    headers: HeaderMap,
    payload: Option<Json<WidgetPingRequest>>,
) -> Response {
    let request = payload.map(|Json(body)| body).unwrap_or_default();

    let project_id = non_empty(request.project_id)
        .unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string());
    let project_key = non_empty(request.project_key);
    // The page's own Origin header backs a missing body field.
    let site_origin = non_empty(request.site_origin).or_else(|| header_string(&headers, ORIGIN));

    let context = AccessContext {
        is_admin_claim: false,
        session_user_id: None,
        request_origin: header_string(&headers, ORIGIN),
        request_referer: header_string(&headers, REFERER),
        api_self_origin: config.public_url().to_string(),
    };

    let decision = match verify_project_access(
        &pool,
        &project_id,
        project_key.as_deref(),
        site_origin.as_deref(),
        &context,
    )
    .await
    {
        Ok(decision) => decision,
        Err(err) => {
            error!("Failed to verify project access: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    if let Decision::Denied(denial) = decision {
        return denial_response(&denial);
    }

    // Key-only pings have nothing to record against.
    let Some(site_origin) = site_origin else {
        return json_error(StatusCode::BAD_REQUEST, "Missing siteOrigin.");
    };

    if let Err(err) = record_widget_ping(&pool, &project_id, &site_origin, now_unix()).await {
        error!("Failed to record widget ping: {err}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (StatusCode::OK, Json(OkResponse { ok: true })).into_response()
}

#[utoipa::path(
    get,
    path = "/api/widget/ping",
    params(WidgetStatusQuery),
    responses(
        (status = 200, description = "Connectivity status", body = WidgetStatusResponse),
        (status = 400, description = "Missing project id", body = ErrorResponse),
        (status = 401, description = "No credential supplied", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 404, description = "Unknown project", body = ErrorResponse)
    ),
    tag = "widget"
)]
pub async fn status(
    config: Extension<Arc<AuthConfig>>,
    pool: Extension<PgPool>,
    headers: HeaderMap,
    Query(query): Query<WidgetStatusQuery>,
) -> Response {
    let Some(project_id) = non_empty(query.project_id) else {
        return json_error(StatusCode::BAD_REQUEST, "Missing projectId.");
    };
    let project_key = non_empty(query.project_key);
    let site_origin = non_empty(query.site_origin);

    let session = session_claims(&config, &headers);
    let is_admin_claim = session.is_some()
        && header_string(&headers, ADMIN_HEADER).as_deref() == Some("1");

    let context = AccessContext {
        is_admin_claim,
        session_user_id: session.map(|claims| claims.sub),
        request_origin: header_string(&headers, ORIGIN),
        request_referer: header_string(&headers, REFERER),
        api_self_origin: config.public_url().to_string(),
    };

    let decision = match verify_project_access(
        &pool,
        &project_id,
        project_key.as_deref(),
        site_origin.as_deref(),
        &context,
    )
    .await
    {
        Ok(decision) => decision,
        Err(err) => {
            error!("Failed to verify project access: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    if let Decision::Denied(denial) = decision {
        return denial_response(&denial);
    }

    let latest = match latest_widget_ping(&pool, &project_id, site_origin.as_deref()).await {
        Ok(latest) => latest,
        Err(err) => {
            error!("Failed to lookup widget ping: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let body = match latest {
        Some(ping) => WidgetStatusResponse {
            connected: now_unix() - ping.last_seen_at <= STALE_WINDOW_SECONDS,
            last_seen_at: Some(ping.last_seen_at),
            site_origin: Some(ping.site_origin),
        },
        None => WidgetStatusResponse {
            connected: false,
            last_seen_at: None,
            site_origin: None,
        },
    };

    (StatusCode::OK, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_trims_and_drops_blanks() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(None), None);
        assert_eq!(
            non_empty(Some(" pk_1 ".to_string())),
            Some("pk_1".to_string())
        );
    }

    #[test]
    fn denial_maps_to_its_status_code() {
        let denial = Denial {
            status: 404,
            message: "Project not found.",
        };
        assert_eq!(denial_response(&denial).status(), StatusCode::NOT_FOUND);
    }
}
