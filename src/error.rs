//! Errors surfaced at the HTTP edge.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Phone number is required")]
    MissingQuery,

    #[error("Invalid phone number format")]
    InvalidFormat,

    #[error("No response from bot")]
    NoBotResponse,

    /// Detail is logged, never returned to the client.
    #[error("Internal server error")]
    Internal(anyhow::Error),
}

/// Generic `{"error": ...}` body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingQuery | ApiError::InvalidFormat => StatusCode::BAD_REQUEST,
            ApiError::NoBotResponse | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            error!("Internal error: {:#}", e);
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
