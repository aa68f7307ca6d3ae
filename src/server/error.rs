//! Error types for the REST API server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::time_series::DataProviderError;
use crate::workbook::BuildError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Column not present in the session's table
    ColumnNotFound(String),
    /// Invalid parameter in request
    InvalidParameter(String),
    /// Invalid date range
    InvalidDateRange(String),
    /// Uploaded workbook could not be turned into a table
    UnprocessableWorkbook(String),
    /// Session not found
    SessionNotFound(Uuid),
    /// Too many concurrent sessions
    SessionLimitReached,
    /// Internal server error
    InternalError(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::ColumnNotFound(name) => write!(f, "Column not found: {}", name),
            ApiError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            ApiError::InvalidDateRange(msg) => write!(f, "Invalid date range: {}", msg),
            ApiError::UnprocessableWorkbook(msg) => write!(f, "Unprocessable workbook: {}", msg),
            ApiError::SessionNotFound(id) => write!(f, "Session not found: {}", id),
            ApiError::SessionLimitReached => write!(f, "Session limit reached"),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ColumnNotFound(_) | ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidParameter(_) | ApiError::InvalidDateRange(_) => StatusCode::BAD_REQUEST,
            ApiError::UnprocessableWorkbook(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::SessionLimitReached => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (error_type, message) = match &self {
            ApiError::ColumnNotFound(name) => (
                "ColumnNotFound",
                format!("Column '{}' not found in table", name),
            ),
            ApiError::InvalidParameter(msg) => ("InvalidParameter", msg.clone()),
            ApiError::InvalidDateRange(msg) => ("InvalidDateRange", msg.clone()),
            ApiError::UnprocessableWorkbook(msg) => ("UnprocessableWorkbook", msg.clone()),
            ApiError::SessionNotFound(id) => (
                "SessionNotFound",
                format!("Session '{}' not found", id),
            ),
            ApiError::SessionLimitReached => (
                "SessionLimitReached",
                "Maximum number of concurrent sessions reached".to_string(),
            ),
            ApiError::InternalError(msg) => ("InternalError", msg.clone()),
        };

        if self.status().is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": error_type,
            "message": message,
        }));

        (self.status(), body).into_response()
    }
}

// Conversions from other error types

impl From<BuildError> for ApiError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::MalformedWorkbook(_) | BuildError::Unreadable(_) => {
                ApiError::UnprocessableWorkbook(err.to_string())
            }
            BuildError::InvalidConfig(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<DataProviderError> for ApiError {
    fn from(err: DataProviderError) -> Self {
        match err {
            DataProviderError::ColumnNotFound(name) => ApiError::ColumnNotFound(name),
            DataProviderError::InvalidDateRange => {
                ApiError::InvalidDateRange("Start date must be before or equal to end date".to_string())
            }
            DataProviderError::Other(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<chrono::ParseError> for ApiError {
    fn from(err: chrono::ParseError) -> Self {
        ApiError::InvalidDateRange(format!("Date parse error: {}", err))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::InternalError(format!("Build task failed: {}", err))
    }
}
