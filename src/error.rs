// Error handling module for the BCR API
// Provides the error taxonomy shared by every controller and its HTTP rendering

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Main error type for the API
/// All handlers return Result<T, ApiError>
///
/// Each variant carries a stable `name` (what clients see in `error.name`),
/// a human-readable message (the `Display` impl) and optional details.
/// The variant → status code mapping lives in `status_code` and nowhere else.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown route
    /// Maps to HTTP 404 Not Found
    #[error("Not found!")]
    NotFound { method: String, url: String },

    /// Login attempted with an email that has no account
    /// Maps to HTTP 404 Not Found
    #[error("{email} is not registered!")]
    EmailNotRegistered { email: String },

    /// Login attempted with the wrong password
    /// Maps to HTTP 401 Unauthorized
    #[error("Password is not correct!")]
    WrongPassword,

    /// Registration attempted with an email that already has an account
    /// Maps to HTTP 422 Unprocessable Entity
    #[error("{email} is already taken!!!")]
    EmailAlreadyTaken { email: String },

    /// A record referenced by the request does not exist
    /// Maps to HTTP 404 Not Found
    #[error("{resource} not found!")]
    RecordNotFound { resource: String },

    /// Authenticated identity whose role is outside the allowed set
    /// Maps to HTTP 401 Unauthorized
    #[error("Access forbidden!")]
    InsufficientAccess { role: String },

    /// No bearer token on a protected route
    #[error("Missing authentication token")]
    MissingToken,

    /// Token that is malformed or signed with another key
    #[error("Invalid token")]
    InvalidToken,

    /// Token whose `exp` claim lies in the past
    #[error("Token has expired")]
    ExpiredToken,

    /// Request body failed validation
    /// Maps to HTTP 422, `details` omitted from the response
    #[error("{0}")]
    Validation(#[from] validator::ValidationErrors),

    /// A write the store refused, or any other failure inside registration
    /// Maps to HTTP 422, `details` omitted from the response
    #[error("{message}")]
    Unprocessable { name: String, message: String },

    /// Persistence layer failure outside of registration
    /// Maps to HTTP 500
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Anything unclassified
    /// Maps to HTTP 500
    #[error("{0}")]
    Internal(String),
}

/// Errors reported by the user and role stores
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write (e.g. duplicate email)
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Any other database failure. The driver message is logged, never returned.
    #[error("A database error occurred")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &error {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation(db_err.message().to_string());
            }
        }
        StoreError::Database(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Unprocessable {
            name: "ValidationError".to_string(),
            message: rejection.body_text(),
        }
    }
}

/// `{ "error": { name, message, details } }`
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub name: String,
    pub message: String,
    /// `None` drops the key entirely; `Some(Value::Null)` renders `"details": null`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    /// Stable error name exposed to clients
    pub fn name(&self) -> &str {
        match self {
            ApiError::NotFound { .. } => "NotFoundError",
            ApiError::EmailNotRegistered { .. } => "EmailNotRegisteredError",
            ApiError::WrongPassword => "WrongPasswordError",
            ApiError::EmailAlreadyTaken { .. } => "EmailAlreadyTakenError",
            ApiError::RecordNotFound { .. } => "RecordNotFoundError",
            ApiError::InsufficientAccess { .. } => "InsufficientAccessError",
            ApiError::MissingToken => "MissingTokenError",
            ApiError::InvalidToken => "InvalidTokenError",
            ApiError::ExpiredToken => "TokenExpiredError",
            ApiError::Validation(_) => "ValidationError",
            ApiError::Unprocessable { name, .. } => name,
            ApiError::Store(_) => "StoreError",
            ApiError::Internal(_) => "Error",
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::EmailNotRegistered { .. } => StatusCode::NOT_FOUND,
            ApiError::WrongPassword => StatusCode::UNAUTHORIZED,
            ApiError::EmailAlreadyTaken { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RecordNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::InsufficientAccess { .. } => StatusCode::UNAUTHORIZED,
            ApiError::MissingToken => StatusCode::UNAUTHORIZED,
            ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::ExpiredToken => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Structured details; `None` means the key is omitted from the response
    pub fn details(&self) -> Option<Value> {
        match self {
            ApiError::NotFound { method, url } => Some(json!({ "method": method, "url": url })),
            ApiError::InsufficientAccess { role } => Some(json!({
                "role": role,
                "reason": format!("{} is not allowed to perform this operation.", role),
            })),
            ApiError::Validation(_) | ApiError::Unprocessable { .. } => None,
            _ => Some(Value::Null),
        }
    }

    /// Collapse unclassified failures into the 422 shape used by registration.
    /// Taxonomy errors keep their own kind and status.
    pub fn into_unprocessable(self) -> Self {
        match self {
            ApiError::Store(err) => ApiError::Unprocessable {
                name: "StoreError".to_string(),
                message: err.to_string(),
            },
            ApiError::Internal(message) => ApiError::Unprocessable {
                name: "Error".to_string(),
                message,
            },
            other => other,
        }
    }

    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                name: self.name().to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        }
    }

    fn log(&self) {
        match self {
            ApiError::Store(StoreError::Database(db_error)) => {
                error!("Database error: {:?}", db_error);
            }
            ApiError::Store(err) => error!("Store error: {}", err),
            ApiError::Internal(msg) => error!("Internal error: {}", msg),
            ApiError::WrongPassword
            | ApiError::InsufficientAccess { .. }
            | ApiError::MissingToken
            | ApiError::InvalidToken
            | ApiError::ExpiredToken => warn!("{}: {}", self.name(), self),
            ApiError::Unprocessable { name, message } => warn!("{}: {}", name, message),
            _ => debug!("{}: {}", self.name(), self),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        (self.status_code(), Json(self.to_envelope())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_carries_method_and_url() {
        let err = ApiError::NotFound {
            method: "POST".to_string(),
            url: "https://cars".to_string(),
        };

        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        let body = serde_json::to_value(err.to_envelope()).unwrap();
        assert_eq!(
            body,
            json!({
                "error": {
                    "name": "NotFoundError",
                    "message": "Not found!",
                    "details": { "method": "POST", "url": "https://cars" }
                }
            })
        );
    }

    #[test]
    fn test_login_errors_are_distinct() {
        let not_registered = ApiError::EmailNotRegistered {
            email: "ghost@example.com".to_string(),
        };
        let wrong_password = ApiError::WrongPassword;

        assert_eq!(not_registered.name(), "EmailNotRegisteredError");
        assert_eq!(not_registered.to_string(), "ghost@example.com is not registered!");
        assert_eq!(not_registered.status_code(), StatusCode::NOT_FOUND);

        assert_eq!(wrong_password.name(), "WrongPasswordError");
        assert_eq!(wrong_password.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_record_not_found_has_null_details() {
        let err = ApiError::RecordNotFound {
            resource: "User".to_string(),
        };
        let body = serde_json::to_value(err.to_envelope()).unwrap();

        assert_eq!(body["error"]["name"], "RecordNotFoundError");
        assert_eq!(body["error"]["message"], "User not found!");
        assert!(body["error"].get("details").unwrap().is_null());
    }

    #[test]
    fn test_unprocessable_omits_details() {
        let err = ApiError::Unprocessable {
            name: "StoreError".to_string(),
            message: "A database error occurred".to_string(),
        };
        let body = serde_json::to_value(err.to_envelope()).unwrap();

        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].get("details").is_none());
    }

    #[test]
    fn test_insufficient_access_explains_role() {
        let err = ApiError::InsufficientAccess {
            role: "CUSTOMER".to_string(),
        };
        let details = err.details().unwrap();

        assert_eq!(details["role"], "CUSTOMER");
        assert_eq!(
            details["reason"],
            "CUSTOMER is not allowed to perform this operation."
        );
    }

    #[test]
    fn test_into_unprocessable_keeps_taxonomy_errors() {
        let taken = ApiError::EmailAlreadyTaken {
            email: "a@b.co".to_string(),
        }
        .into_unprocessable();
        assert!(matches!(taken, ApiError::EmailAlreadyTaken { .. }));

        let store = ApiError::Store(StoreError::Database(sqlx::Error::PoolTimedOut))
            .into_unprocessable();
        assert_eq!(store.name(), "StoreError");
        assert_eq!(store.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        // driver text stays out of client messages
        assert_eq!(store.to_string(), "A database error occurred");
    }

    #[test]
    fn test_internal_is_500_with_null_details() {
        let err = ApiError::Internal("Something went wrong".to_string());
        let body = serde_json::to_value(err.to_envelope()).unwrap();

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "error": { "name": "Error", "message": "Something went wrong", "details": null }
            })
        );
    }
}
