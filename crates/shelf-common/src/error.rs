//! Centralized error types for Shelf.
//!
//! Uses `thiserror` for ergonomic error definitions and provides HTTP-friendly
//! error variants that can be directly converted to responses.
//!
//! Missing or unreadable metadata attributes are deliberately absent from this
//! enum: they are recovered locally through fallbacks and never reach a client.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Request-terminating error produced while serving a file.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request path failed canonicalization or escaped the storage root.
    #[error("Forbidden: {reason}")]
    PathRejected { reason: String },

    /// The resolved path does not exist or is not a regular file.
    #[error("File not found")]
    EntryNotFound,

    #[error("Requested range not satisfiable for {len} bytes")]
    RangeNotSatisfiable { len: u64 },

    // === Infrastructure errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body sent to clients.
#[derive(Serialize)]
struct ErrorResponse {
    code: u16,
    error: String,
    message: String,
}

impl GatewayError {
    /// Map error to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PathRejected { .. } => StatusCode::FORBIDDEN,
            Self::EntryNotFound => StatusCode::NOT_FOUND,
            Self::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error code string for programmatic handling by clients.
    pub fn error_code(&self) -> &str {
        match self {
            Self::PathRejected { .. } => "FORBIDDEN",
            Self::EntryNotFound => "NOT_FOUND",
            Self::RangeNotSatisfiable { .. } => "RANGE_NOT_SATISFIABLE",
            Self::Io(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't leak internal details (or the rejected path) to clients
        let message = match &self {
            GatewayError::Io(e) => {
                tracing::error!("I/O error: {e}");
                "An internal error occurred".to_string()
            }
            GatewayError::Internal(e) => {
                tracing::error!("Internal error: {e}");
                "An internal error occurred".to_string()
            }
            GatewayError::PathRejected { .. } => "Access denied".to_string(),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            code: status.as_u16(),
            error: self.error_code().to_string(),
            message,
        };

        let mut response = (status, axum::Json(body)).into_response();
        if let GatewayError::RangeNotSatisfiable { len } = self {
            if let Ok(v) = HeaderValue::from_str(&format!("bytes */{len}")) {
                response.headers_mut().insert(header::CONTENT_RANGE, v);
            }
        }
        response
    }
}

/// Convenience type alias for Results using GatewayError.
pub type GatewayResult<T> = Result<T, GatewayError>;
