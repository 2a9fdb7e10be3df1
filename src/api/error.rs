//! Uniform API error response, grounded in the dashboard API's `ApiError` /
//! `IntoResponse` shape: `{"error": {"code", "message"}}`. Store errors
//! convert into it so handlers propagate with `?` instead of matching
//! every store error variant themselves.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::assessment::store::AssessmentStoreError;
use crate::config_compiler::CompilationError;
use crate::profiles::ProfileStoreError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, code: "BAD_REQUEST", message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, code: "NOT_FOUND", message: message.into() }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "SERVICE_UNAVAILABLE",
            message: message.into(),
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: "GUARD_RAILS_FAILED",
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<AssessmentStoreError> for ApiError {
    fn from(e: AssessmentStoreError) -> Self {
        match e {
            AssessmentStoreError::Unavailable(msg) => ApiError::service_unavailable(msg),
        }
    }
}

impl From<ProfileStoreError> for ApiError {
    fn from(e: ProfileStoreError) -> Self {
        match e {
            ProfileStoreError::NotFound(id) => ApiError::not_found(format!("profile {id} not found")),
            ProfileStoreError::ObjectStore(msg) | ProfileStoreError::Metadata(msg) => {
                ApiError::service_unavailable(msg)
            }
        }
    }
}

impl From<CompilationError> for ApiError {
    fn from(e: CompilationError) -> Self {
        match &e {
            CompilationError::GuardRailsFailed(_) => ApiError::unprocessable(e.to_string()),
            _ => ApiError::bad_request(e.to_string()),
        }
    }
}
