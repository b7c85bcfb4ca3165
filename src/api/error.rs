//! API error mapping

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::state::HostError;

/// Error returned by HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// Host operation failed
    #[error(transparent)]
    Host(#[from] HostError),

    /// Request body could not be decoded
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Host(HostError::InvalidCourseId(_)) => StatusCode::BAD_REQUEST,
            ApiError::Host(HostError::TrackerNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Host(
                HostError::TrackerFailed(..) | HostError::Lock(_) | HostError::Store(_),
            ) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "status": "error",
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Result type for HTTP handlers
pub type ApiResult<T> = Result<T, ApiError>;
