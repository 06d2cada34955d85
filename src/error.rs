//! Common error type and alias.
//!
//! Every fallible path in the crate returns [`AppResult`]. The HTTP layer maps
//! each variant to a status code and a `{"error": "..."}` body.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::workflow::session::Stage;

pub type AppResult<T> = Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Gemini error: {0}")]
    Gemini(String),
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    NoImage(String),
    #[error("{0}")]
    InvalidImageData(String),
    #[error("{0}")]
    Validation(String),
    #[error("cannot {action} while the session is {stage}")]
    InvalidTransition { action: &'static str, stage: Stage },
    #[error("session was reset before the request finished")]
    Superseded,
    #[error("session not found")]
    SessionNotFound,
    /// User-facing failure of a generation or refine call. The underlying
    /// cause has already been logged.
    #[error("{0}")]
    Generation(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidImageData(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition { .. } | AppError::Superseded => StatusCode::CONFLICT,
            AppError::SessionNotFound => StatusCode::NOT_FOUND,
            AppError::HttpClient(_)
            | AppError::Gemini(_)
            | AppError::Json(_)
            | AppError::NoImage(_)
            | AppError::Generation(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
