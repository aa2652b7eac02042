// Base controller: health check, fallback 404, terminal 500 handler
// Pagination helpers live in `crate::pagination` and are re-exported here

use std::any::Any;

use axum::{
    extract::OriginalUri,
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::{ApiError, ErrorBody, ErrorEnvelope};

pub use crate::pagination::{build_pagination_object, get_offset_from_request};

pub const ROOT_MESSAGE: &str = "BCR API is up and running!";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Handler for GET /
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "API is up", body = HealthResponse)
    ),
    tag = "application"
)]
pub async fn handle_get_root() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK".to_string(),
            message: ROOT_MESSAGE.to_string(),
        }),
    )
}

/// Router fallback: any route that did not match.
/// `url` is the path and query even for absolute-form request targets.
pub async fn handle_not_found(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NotFound {
        method: method.to_string(),
        url: uri
            .path_and_query()
            .map(|p| p.as_str())
            .unwrap_or("/")
            .to_string(),
    }
}

/// Terminal handler for errors that escaped every controller.
/// Always answers 500 with `details: null`.
pub fn handle_error(err: &dyn std::error::Error) -> Response {
    tracing::error!("Unhandled error: {}", err);

    let body = ErrorEnvelope {
        error: ErrorBody {
            name: "Error".to_string(),
            message: err.to_string(),
            details: Some(Value::Null),
        },
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Panic hook for `CatchPanicLayer`, rendered like any other unhandled error
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Internal server error".to_string()
    };

    handle_error(&ApiError::Internal(message))
}
