// JWT token generation and validation service

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::auth::models::{Role, RoleSummary, User};
use crate::error::ApiError;

/// Default token lifetime: one hour
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3600;

/// Identity claims carried by an access token
/// A projection of the User + Role pair at issuance time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub role: RoleSummary,
}

impl Identity {
    pub fn new(user: &User, role: &Role) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            image: user.image.clone(),
            role: role.into(),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub identity: Identity,
    pub iat: i64, // issued at timestamp
    pub exp: i64, // expiration timestamp
}

/// Token signing primitive injected into the authentication service
pub trait TokenService: Send + Sync {
    fn sign(&self, identity: &Identity) -> Result<String, ApiError>;

    fn verify(&self, token: &str) -> Result<Claims, ApiError>;
}

/// HS256 JWTs signed with a server-side secret
pub struct JwtService {
    secret: String,
    ttl_seconds: i64,
}

impl JwtService {
    pub fn new(secret: impl Into<String>, ttl_seconds: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl_seconds,
        }
    }
}

impl TokenService for JwtService {
    fn sign(&self, identity: &Identity) -> Result<String, ApiError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            identity: identity.clone(),
            iat: now,
            exp: now + self.ttl_seconds,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Token generation error: {}", e)))
    }

    fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => ApiError::ExpiredToken,
            _ => ApiError::InvalidToken,
        })
    }
}
