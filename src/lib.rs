//! BCR API: authentication and access-control core of the car-rental REST API.
//!
//! The crate exposes the base controller (health, 404, 500, pagination),
//! the authentication controller (login, register, whoami) and the
//! collaborators they are built from.

pub mod application;
pub mod auth;
pub mod config;
pub mod error;
pub mod pagination;
pub mod validation;

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Json,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use auth::{
    memory::MemoryStore,
    password::BcryptHasher,
    repository::{RoleStore, UserStore},
    token::{JwtService, TokenService},
    AuthDependencies, AuthService, RequireRole,
};
use config::AppConfig;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        application::handle_get_root,
        auth::handlers::handle_login,
        auth::handlers::handle_register,
        auth::handlers::handle_get_user,
    ),
    components(schemas(
        application::HealthResponse,
        auth::models::LoginRequest,
        auth::models::RegisterRequest,
        auth::models::AuthResponse,
        auth::models::UserResponse,
        auth::models::RoleSummary,
        pagination::PaginationMeta,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "application", description = "Health and fallback endpoints"),
        (name = "auth", description = "Login, registration and current user")
    ),
    info(title = "BCR API", version = "1.0.0", description = "Car-rental REST API")
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub tokens: Arc<dyn TokenService>,
}

impl AppState {
    pub fn new(deps: AuthDependencies) -> Self {
        let tokens = Arc::clone(&deps.tokens);
        Self {
            auth: Arc::new(AuthService::new(deps)),
            tokens,
        }
    }

    /// State wired from configuration around the given stores
    pub fn from_config(
        config: &AppConfig,
        user_store: Arc<dyn UserStore>,
        role_store: Arc<dyn RoleStore>,
    ) -> Self {
        Self::new(AuthDependencies {
            user_store,
            role_store,
            hasher: Arc::new(BcryptHasher),
            tokens: Arc::new(JwtService::new(
                config.jwt_signature_key.clone(),
                config.jwt_ttl_seconds,
            )),
            salt_rounds: config.bcrypt_rounds,
        })
    }

    /// State backed by a fresh in-memory store seeded with the default roles
    pub fn in_memory(config: &AppConfig) -> Self {
        let store = Arc::new(MemoryStore::with_default_roles());
        Self::from_config(config, store.clone(), store)
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn require_customer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<axum::response::Response, error::ApiError> {
    RequireRole::customer().middleware(state, request, next).await
}

/// Creates and configures the application router
pub fn create_router(state: AppState) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(application::handle_get_root))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/v1/auth/login", post(auth::handle_login))
        .route("/v1/auth/register", post(auth::handle_register))
        .route(
            "/v1/auth/whoami",
            get(auth::handle_get_user).route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_customer,
            )),
        )
        .fallback(application::handle_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(application::handle_panic))
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
