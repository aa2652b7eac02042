// HTTP handlers for authentication endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::auth::{
    middleware::AuthenticatedUser,
    models::{AuthResponse, LoginRequest, RegisterRequest, UserResponse},
};
use crate::error::ApiError;
use crate::validation::ApiJson;
use crate::AppState;

/// Login a user
/// POST /v1/auth/login
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 201, description = "Credentials accepted", body = AuthResponse),
        (status = 401, description = "Password is not correct"),
        (status = 404, description = "Email is not registered"),
        (status = 422, description = "Body is not a valid login request"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
pub async fn handle_login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let response = state.auth.login(&request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Register a new user
/// POST /v1/auth/register
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = AuthResponse),
        (status = 422, description = "Email already taken or invalid input")
    ),
    tag = "auth"
)]
pub async fn handle_register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let response = state.auth.register(&request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get current user information (protected endpoint)
/// GET /v1/auth/whoami
#[utoipa::path(
    get,
    path = "/v1/auth/whoami",
    responses(
        (status = 200, description = "Authenticated user", body = UserResponse),
        (status = 401, description = "Missing, invalid or insufficient token"),
        (status = 404, description = "User no longer exists")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn handle_get_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>, ApiError> {
    let response = state.auth.get_user(user.id()).await?;
    Ok(Json(response))
}
