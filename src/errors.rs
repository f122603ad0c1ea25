// src/errors.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    #[error("OAuth token not available. Please try again later.")]
    AuthUnavailable,

    #[error("Missing required parameters: {0}.")]
    MissingParameter(String),

    #[error("{message}")]
    UpstreamError {
        message: String,
        payload: Option<Value>,
    },

    #[error("Invalid data format. {0}")]
    InvalidFormat(String),

    #[error("Callback authorization failed")]
    Unauthorized,

    #[error("HTTP client error: {0}")]
    HttpClientError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingParameter(_) | AppError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::ConfigMissing(_)
            | AppError::AuthUnavailable
            | AppError::UpstreamError { .. }
            | AppError::HttpClientError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let timestamp = chrono::Utc::now().to_rfc3339();

        let body = match &self {
            // The upstream payload is echoed so the frontend can show the gateway's reason.
            AppError::UpstreamError { message, payload } => json!({
                "success": false,
                "message": message,
                "error": payload.clone().unwrap_or_else(|| Value::String(message.clone())),
                "timestamp": timestamp,
            }),
            _ => json!({
                "success": false,
                "error": self.to_string(),
                "message": self.to_string(),
                "timestamp": timestamp,
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::UpstreamError {
            message: format!("HTTP request failed: {}", err),
            payload: None,
        }
    }
}

// Helper conversion functions
impl AppError {
    pub fn missing_parameter(msg: impl Into<String>) -> Self {
        AppError::MissingParameter(msg.into())
    }

    pub fn invalid_format(msg: impl Into<String>) -> Self {
        AppError::InvalidFormat(msg.into())
    }

    pub fn upstream(msg: impl Into<String>, payload: Option<Value>) -> Self {
        AppError::UpstreamError {
            message: msg.into(),
            payload,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
