use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("generation timed out after {0:?}")] Timeout(Duration),
    #[error("no text content found in response")] EmptyResponse,
    #[error("demo mode: no API key configured")] DemoMode,
    #[error("Other: {0}")] Other(String),
}

/// Why one step of the draft parsing chain gave up.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftParseError {
    #[error("no JSON object found in response")] NoJsonObject,
    #[error("invalid task JSON: {0}")] InvalidJson(String),
    #[error("response contained no usable tasks")] NoTasks,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")] NotFound(String),
    #[error("{0}")] InvalidInput(String),
    #[error("persistence failure: {0}")] Persistence(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            Self::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
        };

        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "errorCode": error_code,
        });

        (status, Json(body)).into_response()
    }
}
