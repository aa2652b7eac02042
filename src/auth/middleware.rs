// Authentication middleware for protected routes

use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::{
    access_control::{self, RoleName},
    token::Claims,
};
use crate::error::ApiError;
use crate::AppState;

/// Verified identity attached to a request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub claims: Claims,
}

impl AuthenticatedUser {
    pub fn id(&self) -> i32 {
        self.claims.identity.id
    }

    pub fn role_name(&self) -> &str {
        &self.claims.identity.role.name
    }
}

/// Token from an `Authorization: Bearer <token>` header
fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(ApiError::MissingToken)?
        .to_str()
        .map_err(|_| ApiError::InvalidToken)?;

    value
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::InvalidToken)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // already verified by RequireRole
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        let token = bearer_token(&parts.headers)?;
        let claims = state.tokens.verify(token)?;
        Ok(AuthenticatedUser { claims })
    }
}

/// Authorization middleware that requires one of a set of roles
///
/// Verifies the bearer token, checks the token's role against the allowed
/// set, and stores the `AuthenticatedUser` in the request extensions.
#[derive(Debug, Clone)]
pub struct RequireRole {
    allowed: Vec<RoleName>,
}

impl RequireRole {
    pub fn any_of(roles: impl IntoIterator<Item = RoleName>) -> Self {
        Self {
            allowed: roles.into_iter().collect(),
        }
    }

    pub fn admin() -> Self {
        Self::any_of([RoleName::Admin])
    }

    pub fn customer() -> Self {
        Self::any_of([RoleName::Customer])
    }

    pub async fn middleware(
        self,
        state: AppState,
        mut request: Request<Body>,
        next: Next,
    ) -> Result<Response, ApiError> {
        let endpoint = request.uri().path().to_string();

        let token = bearer_token(request.headers()).map_err(|e| {
            warn!("Rejected request to {}: {}", endpoint, e);
            e
        })?;
        let claims = state.tokens.verify(token)?;
        let user = AuthenticatedUser { claims };

        access_control::authorize(user.role_name(), &self.allowed).map_err(|e| {
            warn!(
                "Authorization failed: user_id={}, role={}, endpoint={}",
                user.id(),
                user.role_name(),
                endpoint
            );
            e
        })?;

        debug!(
            "Authorization successful: user_id={}, role={}, endpoint={}",
            user.id(),
            user.role_name(),
            endpoint
        );
        request.extensions_mut().insert(user);
        Ok(next.run(request).await)
    }
}
