//! Request/response types for the API.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserBody {
    pub id: String,
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub user: UserBody,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub next_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

/// Allowed-origins input: either a JSON array or one string split on commas
/// and newlines, the way the dashboard textarea submits it.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum OriginsField {
    List(Vec<String>),
    Text(String),
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBody {
    pub project_id: String,
    pub name: String,
    pub public_key: String,
    pub allowed_origins: Vec<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ProjectResponse {
    pub project: ProjectBody,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ProjectsResponse {
    pub projects: Vec<ProjectBody>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub project_id: String,
    pub name: Option<String>,
    /// Omitted or blank means the server generates a `pk_` key.
    pub public_key: Option<String>,
    pub allowed_origins: Option<OriginsField>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub allowed_origins: Option<OriginsField>,
    #[serde(default)]
    pub rotate_key: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UpdateProfileRequest {
    pub email: String,
}

/// Widget heartbeat body. All fields optional: the Origin header backs
/// `site_origin`, and `project_id` defaults to the demo project.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct WidgetPingRequest {
    pub project_id: Option<String>,
    pub project_key: Option<String>,
    pub site_origin: Option<String>,
}

#[derive(ToSchema, IntoParams, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WidgetStatusQuery {
    pub project_id: Option<String>,
    pub project_key: Option<String>,
    pub site_origin: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WidgetStatusResponse {
    pub connected: bool,
    pub last_seen_at: Option<i64>,
    pub site_origin: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn signup_request_round_trips() -> Result<()> {
        let request = SignupRequest {
            email: "alice@example.com".to_string(),
            password: "hunter22!".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let email = value
            .get("email")
            .and_then(serde_json::Value::as_str)
            .context("missing email")?;
        assert_eq!(email, "alice@example.com");
        let decoded: SignupRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.password, "hunter22!");
        Ok(())
    }

    #[test]
    fn widget_ping_request_tolerates_missing_fields() -> Result<()> {
        let decoded: WidgetPingRequest = serde_json::from_str("{}")?;
        assert!(decoded.project_id.is_none());
        assert!(decoded.project_key.is_none());
        assert!(decoded.site_origin.is_none());
        Ok(())
    }

    #[test]
    fn widget_ping_request_uses_camel_case_keys() -> Result<()> {
        let decoded: WidgetPingRequest =
            serde_json::from_str(r#"{"projectId":"p1","siteOrigin":"https://a.com"}"#)?;
        assert_eq!(decoded.project_id.as_deref(), Some("p1"));
        assert_eq!(decoded.site_origin.as_deref(), Some("https://a.com"));
        Ok(())
    }
}
