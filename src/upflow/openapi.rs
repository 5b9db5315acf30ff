//! OpenAPI document, served through Swagger UI.

use utoipa::OpenApi;

use crate::upflow::handlers;
use crate::upflow::types::{
    ChangePasswordRequest, CreateProjectRequest, ErrorResponse, ForgotPasswordRequest,
    LoginRequest, OkResponse, OriginsField, ProjectBody, ProjectResponse, ProjectsResponse,
    ResetPasswordRequest, SignupRequest, UpdateProfileRequest, UpdateProjectRequest, UserBody,
    UserResponse, WidgetPingRequest, WidgetStatusQuery, WidgetStatusResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::signup::signup,
        handlers::login::login,
        handlers::logout::logout,
        handlers::me::me,
        handlers::password::change_password,
        handlers::profile::update_profile,
        handlers::account::delete,
        handlers::forgot::forgot,
        handlers::reset::reset,
        handlers::projects::list,
        handlers::projects::create,
        handlers::projects::update,
        handlers::projects::remove,
        handlers::widget::ping,
        handlers::widget::status,
    ),
    components(schemas(
        ChangePasswordRequest,
        CreateProjectRequest,
        ErrorResponse,
        ForgotPasswordRequest,
        LoginRequest,
        OkResponse,
        OriginsField,
        ProjectBody,
        ProjectResponse,
        ProjectsResponse,
        ResetPasswordRequest,
        SignupRequest,
        UpdateProfileRequest,
        UpdateProjectRequest,
        UserBody,
        UserResponse,
        WidgetPingRequest,
        WidgetStatusQuery,
        WidgetStatusResponse,
    )),
    tags(
        (name = "auth", description = "Sessions, credentials, and password resets"),
        (name = "projects", description = "Project management for the dashboard"),
        (name = "widget", description = "Third-party widget access"),
        (name = "system", description = "Service health")
    )
)]
pub struct ApiDoc;
