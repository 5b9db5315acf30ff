//! Project management for the authenticated dashboard.
//!
//! Projects are the tenants: each carries the widget bearer key and the
//! origin allow-list the access verifier judges against. Every signup is
//! seeded with a demo project so the embedded widget works out of the box;
//! the demo project keeps its origin list locked and cannot be deleted.

use anyhow::{Context, Result};
use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rand::{rngs::OsRng, RngCore};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::access::ProjectRecord;
use crate::auth::{AuthConfig, AuthError};
use crate::upflow::storage::{
    delete_project, fetch_project_owned, insert_project, list_projects, owner_has_projects,
    update_project, CreateProjectOutcome,
};
use crate::upflow::types::{
    CreateProjectRequest, ErrorResponse, OkResponse, OriginsField, ProjectBody, ProjectResponse,
    ProjectsResponse, UpdateProjectRequest,
};

use super::{json_error, session_claims};

const DEMO_PROJECT_ID: &str = "demo";
const DEMO_PROJECT_NAME: &str = "Demo";
const PUBLIC_KEY_BYTES: usize = 16;

const DEMO_ALLOWED_ORIGINS: &[&str] = &[
    "https://upflow--upflow--574qbjcqcwyr.code.run",
    "https://www.upflow.website",
    "https://upflow.website",
];

/// Generate a fresh `pk_` widget key.
///
/// # Errors
///
/// Returns an error if the OS RNG fails.
pub(super) fn generate_public_key() -> Result<String> {
    let mut bytes = [0u8; PUBLIC_KEY_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate public key")?;
    Ok(format!("pk_{}", hex::encode(bytes)))
}

/// Trim entries and collapse duplicates, keeping first-seen order. The text
/// form splits on commas and newlines.
fn normalize_origins(field: &OriginsField) -> Vec<String> {
    let raw: Vec<String> = match field {
        OriginsField::List(entries) => entries.clone(),
        OriginsField::Text(text) => text
            .split(['\n', ','])
            .map(str::to_string)
            .collect(),
    };

    let mut origins = Vec::new();
    for entry in raw {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !origins.iter().any(|seen: &String| seen == trimmed) {
            origins.push(trimmed.to_string());
        }
    }
    origins
}

fn is_demo_project(project: &ProjectRecord) -> bool {
    project.project_id == DEMO_PROJECT_ID || project.name.eq_ignore_ascii_case(DEMO_PROJECT_NAME)
}

fn project_body(project: ProjectRecord) -> ProjectBody {
    ProjectBody {
        project_id: project.project_id,
        name: project.name,
        public_key: project.public_key,
        allowed_origins: project.allowed_origins,
    }
}

/// Seed the demo project for a fresh account. First-project-only: an owner
/// who already has projects is left alone. When the `demo` id is taken by
/// another account, a suffixed id is used instead.
pub(super) async fn seed_demo_project(pool: &PgPool, owner_id: uuid::Uuid) -> Result<()> {
    if owner_has_projects(pool, owner_id).await? {
        return Ok(());
    }

    let origins: Vec<String> = DEMO_ALLOWED_ORIGINS
        .iter()
        .map(|origin| (*origin).to_string())
        .collect();

    let outcome = insert_project(
        pool,
        DEMO_PROJECT_ID,
        owner_id,
        DEMO_PROJECT_NAME,
        &generate_public_key()?,
        &origins,
    )
    .await?;

    if let CreateProjectOutcome::Conflict = outcome {
        let mut suffix = [0u8; 4];
        OsRng
            .try_fill_bytes(&mut suffix)
            .context("failed to generate demo project id")?;
        let fallback_id = format!("demo-{}", hex::encode(suffix));
        insert_project(
            pool,
            &fallback_id,
            owner_id,
            DEMO_PROJECT_NAME,
            &generate_public_key()?,
            &origins,
        )
        .await?;
    }

    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/projects",
    responses(
        (status = 200, description = "Projects owned by the caller", body = ProjectsResponse),
        (status = 401, description = "No valid session", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn list(
    config: Extension<Arc<AuthConfig>>,
    pool: Extension<PgPool>,
    headers: HeaderMap,
) -> Response {
    let Some(claims) = session_claims(&config, &headers) else {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthorized.");
    };

    let projects = match list_projects(&pool, claims.sub).await {
        Ok(projects) => projects,
        Err(err) => {
            error!("Failed to list projects: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let body = ProjectsResponse {
        projects: projects.into_iter().map(project_body).collect(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

#[utoipa::path(
    post,
    path = "/api/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 200, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Missing project id", body = ErrorResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 409, description = "Project id already taken", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn create(
    config: Extension<Arc<AuthConfig>>,
    pool: Extension<PgPool>,
    headers: HeaderMap,
    payload: Option<Json<CreateProjectRequest>>,
) -> Response {
    let Some(claims) = session_claims(&config, &headers) else {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthorized.");
    };
    let Some(Json(request)) = payload else {
        return AuthError::Validation("Missing payload.").into_response();
    };

    let project_id = request.project_id.trim().to_string();
    if project_id.is_empty() {
        return AuthError::Validation("Missing projectId.").into_response();
    }
    let name = request.name.as_deref().unwrap_or("").trim().to_string();

    let public_key = match request
        .public_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
    {
        Some(key) => key.to_string(),
        None => match generate_public_key() {
            Ok(key) => key,
            Err(err) => {
                error!("Failed to generate public key: {err}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        },
    };

    let allowed_origins = request
        .allowed_origins
        .as_ref()
        .map(normalize_origins)
        .unwrap_or_default();

    // Project ids are globally unique so the widget can name them without an
    // owner qualifier.
    let outcome = match insert_project(
        &pool,
        &project_id,
        claims.sub,
        &name,
        &public_key,
        &allowed_origins,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("Failed to create project: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match outcome {
        CreateProjectOutcome::Created(project) => {
            let body = ProjectResponse {
                project: project_body(project),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        CreateProjectOutcome::Conflict => {
            json_error(StatusCode::CONFLICT, "Project already exists.")
        }
    }
}

#[utoipa::path(
    patch,
    path = "/api/projects/{project_id}",
    params(("project_id" = String, Path, description = "Project identifier")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated", body = ProjectResponse),
        (status = 400, description = "Nothing to update", body = ErrorResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 403, description = "Demo project origins are locked", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn update(
    config: Extension<Arc<AuthConfig>>,
    pool: Extension<PgPool>,
    headers: HeaderMap,
    Path(project_id): Path<String>,
    payload: Option<Json<UpdateProjectRequest>>,
) -> Response {
    let Some(claims) = session_claims(&config, &headers) else {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthorized.");
    };
    let Some(Json(request)) = payload else {
        return AuthError::Validation("Missing payload.").into_response();
    };

    let project = match fetch_project_owned(&pool, claims.sub, &project_id).await {
        Ok(Some(project)) => project,
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "Project not found."),
        Err(err) => {
            error!("Failed to fetch project: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let name = request.name.as_deref().map(|name| name.trim().to_string());
    let mut allowed_origins = request.allowed_origins.as_ref().map(normalize_origins);

    // The demo project's allow-list is managed by the platform; a request
    // that only touches it is refused, one that also changes something else
    // silently keeps the list.
    if is_demo_project(&project) && allowed_origins.is_some() {
        allowed_origins = None;
        if name.is_none() && !request.rotate_key {
            return json_error(StatusCode::FORBIDDEN, "Demo project origins are locked.");
        }
    }

    if name.is_none() && allowed_origins.is_none() && !request.rotate_key {
        return AuthError::Validation("Nothing to update.").into_response();
    }

    let new_public_key = if request.rotate_key {
        match generate_public_key() {
            Ok(key) => Some(key),
            Err(err) => {
                error!("Failed to generate public key: {err}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    } else {
        None
    };

    let updated = match update_project(
        &pool,
        claims.sub,
        &project_id,
        name,
        allowed_origins,
        new_public_key,
    )
    .await
    {
        Ok(Some(project)) => project,
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "Project not found."),
        Err(err) => {
            error!("Failed to update project: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let body = ProjectResponse {
        project: project_body(updated),
    };
    (StatusCode::OK, Json(body)).into_response()
}

#[utoipa::path(
    delete,
    path = "/api/projects/{project_id}",
    params(("project_id" = String, Path, description = "Project identifier")),
    responses(
        (status = 200, description = "Project deleted", body = OkResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 403, description = "Demo project cannot be deleted", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn remove(
    config: Extension<Arc<AuthConfig>>,
    pool: Extension<PgPool>,
    headers: HeaderMap,
    Path(project_id): Path<String>,
) -> Response {
    let Some(claims) = session_claims(&config, &headers) else {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthorized.");
    };

    let project = match fetch_project_owned(&pool, claims.sub, &project_id).await {
        Ok(Some(project)) => project,
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "Project not found."),
        Err(err) => {
            error!("Failed to fetch project: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if is_demo_project(&project) {
        return json_error(StatusCode::FORBIDDEN, "The demo project cannot be deleted.");
    }

    match delete_project(&pool, claims.sub, &project_id).await {
        Ok(true) => (StatusCode::OK, Json(OkResponse { ok: true })).into_response(),
        Ok(false) => json_error(StatusCode::NOT_FOUND, "Project not found."),
        Err(err) => {
            error!("Failed to delete project: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn project(project_id: &str, name: &str) -> ProjectRecord {
        ProjectRecord {
            project_id: project_id.to_string(),
            owner_id: Uuid::new_v4(),
            name: name.to_string(),
            public_key: "pk_live_1234".to_string(),
            allowed_origins: Vec::new(),
        }
    }

    #[test]
    fn generated_keys_carry_the_pk_prefix() {
        let first = generate_public_key().expect("rng should work");
        let second = generate_public_key().expect("rng should work");
        assert!(first.starts_with("pk_"));
        assert_eq!(first.len(), 3 + PUBLIC_KEY_BYTES * 2);
        assert_ne!(first, second);
    }

    #[test]
    fn origins_list_is_trimmed_and_deduplicated() {
        let field = OriginsField::List(vec![
            " https://a.com ".to_string(),
            String::new(),
            "https://a.com".to_string(),
            "https://b.com".to_string(),
        ]);
        assert_eq!(
            normalize_origins(&field),
            vec!["https://a.com".to_string(), "https://b.com".to_string()]
        );
    }

    #[test]
    fn origins_text_splits_on_commas_and_newlines() {
        let field = OriginsField::Text(
            "https://a.com, https://b.com\nhttps://a.com\n\n".to_string(),
        );
        assert_eq!(
            normalize_origins(&field),
            vec!["https://a.com".to_string(), "https://b.com".to_string()]
        );
    }

    #[test]
    fn demo_detection_covers_id_and_name() {
        assert!(is_demo_project(&project("demo", "Anything")));
        assert!(is_demo_project(&project("p1", "DEMO")));
        assert!(!is_demo_project(&project("p1", "Production")));
    }
}
