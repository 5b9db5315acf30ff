//! HTTP surface: router, middleware layers, and server startup.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::Extension,
    http::{
        header::CONTENT_TYPE, HeaderName, HeaderValue, Method, Request,
    },
    routing::{delete, get, patch, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::AuthConfig;

pub mod email;
pub mod handlers;
mod openapi;
pub(crate) mod storage;
pub mod types;

use email::EmailSender;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    auth_config: AuthConfig,
    email_sender: Arc<dyn EmailSender>,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let config = Arc::new(auth_config);

    // Widget traffic comes from arbitrary third-party pages; the widget paths
    // carry no cookies, so a wide-open CORS policy without credentials is safe.
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, HeaderName::from_static("x-upflow-admin")])
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_origin(Any);

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/auth/signup", post(handlers::signup::signup))
        .route("/api/auth/login", post(handlers::login::login))
        .route("/api/auth/logout", post(handlers::logout::logout))
        .route("/api/auth/me", get(handlers::me::me))
        .route(
            "/api/auth/password",
            patch(handlers::password::change_password),
        )
        .route("/api/auth/account", delete(handlers::account::delete))
        .route(
            "/api/auth/profile",
            patch(handlers::profile::update_profile),
        )
        .route("/api/auth/forgot", post(handlers::forgot::forgot))
        .route("/api/auth/reset", post(handlers::reset::reset))
        .route(
            "/api/projects",
            get(handlers::projects::list).post(handlers::projects::create),
        )
        .route(
            "/api/projects/:project_id",
            patch(handlers::projects::update).delete(handlers::projects::remove),
        )
        .route(
            "/api/widget/ping",
            post(handlers::widget::ping).get(handlers::widget::status),
        )
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &Request<Body>| {
                        HeaderValue::from_str(Ulid::new().to_string().as_str()).ok()
                    },
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(config))
                .layer(Extension(email_sender))
                .layer(Extension(pool)),
        );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;
    info!("Listening on port {port}");

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    info_span!(
        "http.request",
        method = %request.method(),
        uri = %request.uri(),
        request_id
    )
}
