//! Project access verifier.
//!
//! Single authorization decision point for every tenant-scoped operation.
//! Callers resolve an optional session identity first, then ask this module
//! whether the caller (owner session, public widget key, or browser origin)
//! may act against a given project. The decision logic itself is a pure
//! function over an optional project record; [`verify_project_access`] wraps
//! it with the one database lookup it needs.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::constant_time_eq;

mod origin;
use origin::{is_same_origin, origin_allowed};

/// Tenant record, as read from storage.
#[derive(Debug, Clone)]
pub struct ProjectRecord {
    pub project_id: String,
    pub owner_id: Uuid,
    pub name: String,
    /// Bearer credential for the embedded widget; rotation invalidates the
    /// old value instantly.
    pub public_key: String,
    pub allowed_origins: Vec<String>,
}

/// Request-side facts the verifier needs beyond the presented credentials.
#[derive(Debug, Default, Clone)]
pub struct AccessContext {
    /// Out-of-band "this is the trusted dashboard" marker. Only honored
    /// together with same-origin proof.
    pub is_admin_claim: bool,
    pub session_user_id: Option<Uuid>,
    pub request_origin: Option<String>,
    pub request_referer: Option<String>,
    /// The API's own public origin.
    pub api_self_origin: String,
}

/// Outcome of a verification, consumed synchronously by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(Denial),
}

/// Status/reason pair for a denial. The reason text never reveals which
/// credential path was attempted beyond these fixed categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub status: u16,
    pub message: &'static str,
}

const DENY_NOT_FOUND: Denial = Denial {
    status: 404,
    message: "Project not found.",
};
const DENY_FORBIDDEN: Denial = Denial {
    status: 403,
    message: "Project access denied.",
};
const DENY_NO_CREDENTIAL: Denial = Denial {
    status: 401,
    message: "Missing projectKey or siteOrigin.",
};

/// Evaluate an access request against a project record.
///
/// Steps run in strict order, first match wins: project existence, the admin
/// same-origin path, the public-key path, the origin allow-list path, then
/// the no-credential and catch-all denials.
#[must_use]
pub fn evaluate(
    project: Option<&ProjectRecord>,
    presented_key: Option<&str>,
    presented_origin: Option<&str>,
    context: &AccessContext,
) -> Decision {
    let Some(project) = project else {
        return Decision::Denied(DENY_NOT_FOUND);
    };

    // The authenticated dashboard calling its own backend manages projects
    // without the public key, but only for projects it owns.
    if context.is_admin_claim
        && is_same_origin(
            Some(context.api_self_origin.as_str()),
            context.request_origin.as_deref(),
            context.request_referer.as_deref(),
        )
    {
        return match context.session_user_id {
            Some(user_id) if user_id == project.owner_id => Decision::Allowed,
            _ => Decision::Denied(DENY_FORBIDDEN),
        };
    }

    if let Some(key) = presented_key {
        if !key.is_empty() && constant_time_eq(key.as_bytes(), project.public_key.as_bytes()) {
            return Decision::Allowed;
        }
    }

    if let Some(site_origin) = presented_origin {
        if !site_origin.is_empty() && origin_allowed(site_origin, &project.allowed_origins) {
            return Decision::Allowed;
        }
    }

    let no_key = presented_key.is_none_or(str::is_empty);
    let no_origin = presented_origin.is_none_or(str::is_empty);
    if no_key && no_origin {
        Decision::Denied(DENY_NO_CREDENTIAL)
    } else {
        Decision::Denied(DENY_FORBIDDEN)
    }
}

/// Look up the project and evaluate the access request against it.
///
/// # Errors
///
/// Returns an error only for storage failures; every authorization outcome is
/// a [`Decision`].
pub async fn verify_project_access(
    pool: &PgPool,
    project_id: &str,
    presented_key: Option<&str>,
    presented_origin: Option<&str>,
    context: &AccessContext,
) -> Result<Decision> {
    let project = lookup_project(pool, project_id).await?;
    Ok(evaluate(
        project.as_ref(),
        presented_key,
        presented_origin,
        context,
    ))
}

/// Fetch a project by its caller-chosen identifier.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn lookup_project(pool: &PgPool, project_id: &str) -> Result<Option<ProjectRecord>> {
    let query = "SELECT project_id, owner_id, name, public_key, allowed_origins \
                 FROM projects WHERE project_id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(project_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup project")?;

    Ok(row.map(|row| ProjectRecord {
        project_id: row.get("project_id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        public_key: row.get("public_key"),
        allowed_origins: row.get("allowed_origins"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectRecord {
        ProjectRecord {
            project_id: "p1".to_string(),
            owner_id: Uuid::new_v4(),
            name: "Demo".to_string(),
            public_key: "pk_live_1234".to_string(),
            allowed_origins: vec!["https://a.com".to_string()],
        }
    }

    fn context() -> AccessContext {
        AccessContext {
            api_self_origin: "https://app.upflow.dev".to_string(),
            ..AccessContext::default()
        }
    }

    #[test]
    fn missing_project_is_404_regardless_of_other_input() {
        let ctx = AccessContext {
            is_admin_claim: true,
            session_user_id: Some(Uuid::new_v4()),
            request_origin: Some("https://app.upflow.dev".to_string()),
            ..context()
        };
        let decision = evaluate(None, Some("pk_live_1234"), Some("https://a.com"), &ctx);
        assert_eq!(decision, Decision::Denied(DENY_NOT_FOUND));
    }

    #[test]
    fn allowed_origin_grants_access_without_key() {
        let project = project();
        let decision = evaluate(Some(&project), None, Some("https://a.com"), &context());
        assert_eq!(decision, Decision::Allowed);
    }

    #[test]
    fn port_mismatch_is_denied() {
        let project = project();
        let decision = evaluate(Some(&project), None, Some("https://a.com:8080"), &context());
        assert_eq!(decision, Decision::Denied(DENY_FORBIDDEN));
    }

    #[test]
    fn matching_public_key_wins_regardless_of_allow_list() {
        let mut project = project();
        project.allowed_origins.clear();
        let decision = evaluate(Some(&project), Some("pk_live_1234"), None, &context());
        assert_eq!(decision, Decision::Allowed);
    }

    #[test]
    fn wrong_key_with_no_origin_is_forbidden_not_unauthorized() {
        let project = project();
        let decision = evaluate(Some(&project), Some("pk_wrong"), None, &context());
        assert_eq!(decision, Decision::Denied(DENY_FORBIDDEN));
    }

    #[test]
    fn no_credentials_at_all_is_401() {
        let project = project();
        let decision = evaluate(Some(&project), None, None, &context());
        assert_eq!(decision, Decision::Denied(DENY_NO_CREDENTIAL));

        // Empty strings count as absent.
        let decision = evaluate(Some(&project), Some(""), Some(""), &context());
        assert_eq!(decision, Decision::Denied(DENY_NO_CREDENTIAL));
    }

    #[test]
    fn admin_same_origin_owner_is_allowed_without_credentials() {
        let project = project();
        let ctx = AccessContext {
            is_admin_claim: true,
            session_user_id: Some(project.owner_id),
            request_origin: Some("https://app.upflow.dev".to_string()),
            ..context()
        };
        assert_eq!(evaluate(Some(&project), None, None, &ctx), Decision::Allowed);
    }

    #[test]
    fn admin_same_origin_non_owner_is_403() {
        let project = project();
        let ctx = AccessContext {
            is_admin_claim: true,
            session_user_id: Some(Uuid::new_v4()),
            request_origin: Some("https://app.upflow.dev".to_string()),
            ..context()
        };
        assert_eq!(
            evaluate(Some(&project), None, None, &ctx),
            Decision::Denied(DENY_FORBIDDEN)
        );
    }

    #[test]
    fn admin_without_session_identity_is_403() {
        let project = project();
        let ctx = AccessContext {
            is_admin_claim: true,
            session_user_id: None,
            request_origin: Some("https://app.upflow.dev".to_string()),
            ..context()
        };
        assert_eq!(
            evaluate(Some(&project), None, None, &ctx),
            Decision::Denied(DENY_FORBIDDEN)
        );
    }

    #[test]
    fn admin_claim_from_foreign_origin_falls_through_to_credentials() {
        let project = project();
        let ctx = AccessContext {
            is_admin_claim: true,
            session_user_id: Some(project.owner_id),
            request_origin: Some("https://evil.dev".to_string()),
            ..context()
        };
        // Same-origin proof failed, so the admin path is skipped entirely and
        // the request is judged on the credentials it presented: none.
        assert_eq!(
            evaluate(Some(&project), None, None, &ctx),
            Decision::Denied(DENY_NO_CREDENTIAL)
        );
    }

    #[test]
    fn admin_same_origin_via_referer_fallback() {
        let project = project();
        let ctx = AccessContext {
            is_admin_claim: true,
            session_user_id: Some(project.owner_id),
            request_origin: None,
            request_referer: Some("https://app.upflow.dev/dashboard".to_string()),
            ..context()
        };
        assert_eq!(evaluate(Some(&project), None, None, &ctx), Decision::Allowed);
    }

    #[test]
    fn malformed_presented_origin_never_matches() {
        let mut project = project();
        project.allowed_origins = vec!["not a url".to_string()];
        // Not even against an identical malformed allow-list entry.
        let decision = evaluate(Some(&project), None, Some("not a url"), &context());
        assert_eq!(decision, Decision::Denied(DENY_FORBIDDEN));
    }
}
