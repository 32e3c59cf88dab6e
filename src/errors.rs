// src/errors.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

const STK_PUSH_FAILED: &str = "STK Push failed";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider answered with an `errorCode` body; the body is returned as-is.
    #[error("Daraja rejected the request")]
    ProviderRejected(Value),

    #[error("Daraja responded with {status}")]
    Upstream { status: StatusCode, body: Value },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
            }
            AppError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
            }
            AppError::ProviderRejected(body) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            AppError::Upstream { body, .. } => failure(body),
            AppError::Configuration(_) | AppError::Http(_) | AppError::MalformedResponse(_) => {
                failure(Value::String(self.to_string()))
            }
        }
    }
}

fn failure(error: Value) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "message": STK_PUSH_FAILED,
            "error": error,
        })),
    )
        .into_response()
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::Configuration(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        AppError::MalformedResponse(msg.into())
    }

    /// Keeps the provider's JSON body when it has one, otherwise its raw text.
    pub fn upstream(status: u16, body: &str) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
        let body = serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()));
        AppError::Upstream { status, body }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
