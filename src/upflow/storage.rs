//! Database helpers for users, projects, reset tokens, and widget pings.

use anyhow::{Context, Result};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use crate::access::ProjectRecord;

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub(crate) enum SignupOutcome {
    Created(Uuid),
    Conflict,
}

/// Identity record as the handlers need it.
#[derive(Debug)]
pub(crate) struct UserRecord {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) password_hash: String,
}

pub(crate) struct PingRecord {
    pub(crate) site_origin: String,
    pub(crate) last_seen_at: i64,
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

pub(crate) async fn lookup_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query = "SELECT id, email, password_hash FROM users WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.map(|row| UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
    }))
}

pub(crate) async fn lookup_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRecord>> {
    let query = "SELECT id, email, password_hash FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    Ok(row.map(|row| UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
    }))
}

pub(crate) async fn insert_user(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<SignupOutcome> {
    let query = "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING id";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(SignupOutcome::Created(row.get("id"))),
        Err(err) if is_unique_violation(&err) => Ok(SignupOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

pub(crate) async fn update_password(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> Result<()> {
    let query = "UPDATE users SET password_hash = $2 WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password")?;

    Ok(())
}

/// Store a pending reset, overwriting any prior one. Last writer wins; a
/// stale in-flight email link simply stops matching.
pub(crate) async fn set_reset_token(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &str,
    expires_at: i64,
) -> Result<()> {
    let query = "UPDATE users SET reset_token_hash = $2, reset_token_expires = $3 WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to store reset token")?;

    Ok(())
}

/// Swap the password and clear the reset fields in one conditional update.
///
/// The WHERE clause is [`crate::auth::reset::redeemable`] in SQL: hash match
/// plus strict expiry. Match, password change, and clear are a single
/// statement, so two racing consumers cannot both spend the same token.
/// Returns false when nothing matched, without revealing whether the token
/// was unknown or expired.
pub(crate) async fn consume_reset_token(
    pool: &PgPool,
    token_hash: &str,
    now: i64,
    new_password_hash: &str,
) -> Result<bool> {
    let query = "UPDATE users \
                 SET password_hash = $3, reset_token_hash = NULL, reset_token_expires = NULL \
                 WHERE reset_token_hash = $1 AND reset_token_expires > $2 \
                 RETURNING id";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .bind(now)
        .bind(new_password_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume reset token")?;

    Ok(row.is_some())
}

/// Delete the user together with owned projects and their widget pings, so
/// no project bearer key survives the account.
pub(crate) async fn delete_account(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let mut tx = pool.begin().await.context("begin account deletion")?;

    sqlx::query(
        "DELETE FROM widget_pings WHERE project_id IN \
         (SELECT project_id FROM projects WHERE owner_id = $1)",
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await
    .context("failed to delete widget pings")?;

    sqlx::query("DELETE FROM projects WHERE owner_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("failed to delete projects")?;

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("failed to delete user")?;

    tx.commit().await.context("commit account deletion")?;

    Ok(())
}

/// Outcome when attempting to create a project under a globally unique id.
#[derive(Debug)]
pub(crate) enum CreateProjectOutcome {
    Created(ProjectRecord),
    Conflict,
}

/// Outcome when changing an account email.
#[derive(Debug)]
pub(crate) enum UpdateEmailOutcome {
    Updated(UserRecord),
    Conflict,
    NotFound,
}

fn row_to_project(row: &PgRow) -> ProjectRecord {
    ProjectRecord {
        project_id: row.get("project_id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        public_key: row.get("public_key"),
        allowed_origins: row.get("allowed_origins"),
    }
}

pub(crate) async fn list_projects(pool: &PgPool, owner_id: Uuid) -> Result<Vec<ProjectRecord>> {
    let query = "SELECT project_id, owner_id, name, public_key, allowed_origins \
                 FROM projects WHERE owner_id = $1 ORDER BY created_at DESC";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(owner_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list projects")?;

    Ok(rows.iter().map(row_to_project).collect())
}

pub(crate) async fn fetch_project_owned(
    pool: &PgPool,
    owner_id: Uuid,
    project_id: &str,
) -> Result<Option<ProjectRecord>> {
    let query = "SELECT project_id, owner_id, name, public_key, allowed_origins \
                 FROM projects WHERE project_id = $1 AND owner_id = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(project_id)
        .bind(owner_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch project")?;

    Ok(row.as_ref().map(row_to_project))
}

pub(crate) async fn owner_has_projects(pool: &PgPool, owner_id: Uuid) -> Result<bool> {
    let query = "SELECT 1 AS present FROM projects WHERE owner_id = $1 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(owner_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check for owned projects")?;

    Ok(row.is_some())
}

pub(crate) async fn insert_project(
    pool: &PgPool,
    project_id: &str,
    owner_id: Uuid,
    name: &str,
    public_key: &str,
    allowed_origins: &[String],
) -> Result<CreateProjectOutcome> {
    let query = "INSERT INTO projects \
                 (project_id, owner_id, name, public_key, allowed_origins, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 RETURNING project_id, owner_id, name, public_key, allowed_origins";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(project_id)
        .bind(owner_id)
        .bind(name)
        .bind(public_key)
        .bind(allowed_origins.to_vec())
        .bind(crate::auth::now_unix())
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(CreateProjectOutcome::Created(row_to_project(&row))),
        Err(err) if is_unique_violation(&err) => Ok(CreateProjectOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert project"),
    }
}

/// Apply a partial project update; absent fields keep their stored value.
/// Scoped to the owner, so a foreign project id reads as missing.
pub(crate) async fn update_project(
    pool: &PgPool,
    owner_id: Uuid,
    project_id: &str,
    name: Option<String>,
    allowed_origins: Option<Vec<String>>,
    new_public_key: Option<String>,
) -> Result<Option<ProjectRecord>> {
    let query = "UPDATE projects SET \
                 name = COALESCE($3::TEXT, name), \
                 allowed_origins = COALESCE($4::TEXT[], allowed_origins), \
                 public_key = COALESCE($5::TEXT, public_key) \
                 WHERE project_id = $1 AND owner_id = $2 \
                 RETURNING project_id, owner_id, name, public_key, allowed_origins";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(project_id)
        .bind(owner_id)
        .bind(name)
        .bind(allowed_origins)
        .bind(new_public_key)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update project")?;

    Ok(row.as_ref().map(row_to_project))
}

/// Delete an owned project together with its widget pings. Returns false when
/// the owner has no such project.
pub(crate) async fn delete_project(
    pool: &PgPool,
    owner_id: Uuid,
    project_id: &str,
) -> Result<bool> {
    let mut tx = pool.begin().await.context("begin project deletion")?;

    let deleted = sqlx::query(
        "DELETE FROM projects WHERE project_id = $1 AND owner_id = $2 RETURNING project_id",
    )
    .bind(project_id)
    .bind(owner_id)
    .fetch_optional(&mut *tx)
    .await
    .context("failed to delete project")?;

    if deleted.is_none() {
        return Ok(false);
    }

    sqlx::query("DELETE FROM widget_pings WHERE project_id = $1")
        .bind(project_id)
        .execute(&mut *tx)
        .await
        .context("failed to delete widget pings")?;

    tx.commit().await.context("commit project deletion")?;

    Ok(true)
}

pub(crate) async fn update_email(
    pool: &PgPool,
    user_id: Uuid,
    email: &str,
) -> Result<UpdateEmailOutcome> {
    let query = "UPDATE users SET email = $2 WHERE id = $1 \
                 RETURNING id, email, password_hash";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await;

    match row {
        Ok(Some(row)) => Ok(UpdateEmailOutcome::Updated(UserRecord {
            id: row.get("id"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
        })),
        Ok(None) => Ok(UpdateEmailOutcome::NotFound),
        Err(err) if is_unique_violation(&err) => Ok(UpdateEmailOutcome::Conflict),
        Err(err) => Err(err).context("failed to update email"),
    }
}

pub(crate) async fn record_widget_ping(
    pool: &PgPool,
    project_id: &str,
    site_origin: &str,
    now: i64,
) -> Result<()> {
    let query = "INSERT INTO widget_pings (project_id, site_origin, last_seen_at) \
                 VALUES ($1, $2, $3) \
                 ON CONFLICT (project_id, site_origin) \
                 DO UPDATE SET last_seen_at = EXCLUDED.last_seen_at";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(project_id)
        .bind(site_origin)
        .bind(now)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to record widget ping")?;

    Ok(())
}

pub(crate) async fn latest_widget_ping(
    pool: &PgPool,
    project_id: &str,
    site_origin: Option<&str>,
) -> Result<Option<PingRecord>> {
    let query = "SELECT site_origin, last_seen_at FROM widget_pings \
                 WHERE project_id = $1 AND ($2::TEXT IS NULL OR site_origin = $2) \
                 ORDER BY last_seen_at DESC LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(project_id)
        .bind(site_origin)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup widget ping")?;

    Ok(row.map(|row| PingRecord {
        site_origin: row.get("site_origin"),
        last_seen_at: row.get("last_seen_at"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }
}
