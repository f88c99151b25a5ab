//! API error responses.
//!
//! Handler failures are rendered as `{error, message}` JSON and tagged with a
//! [`HandlerFault`] extension so the instrumentation middleware can count
//! them.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use shared::export::ExportError;
use thiserror::Error;

/// Response extension marking a response produced by a failed handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFault {
    /// Short classification of the failure, e.g. `invalid_argument` or `panic`.
    pub kind: &'static str,
}

impl HandlerFault {
    /// Creates a fault marker of the given kind.
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self { kind }
    }
}

/// Error body returned to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable description.
    pub message: String,
}

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller supplied an argument the handler cannot accept.
    #[error("{0}")]
    InvalidArgument(String),

    /// Exporting the store failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidArgument(_) | Self::Export(ExportError::UnsupportedFormat(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_argument")
            }
            Self::Export(ExportError::Serialization(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "serialization_error")
            }
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::error!(error = %self, kind, "Request failed");
        } else {
            tracing::debug!(error = %self, kind, "Request rejected");
        }

        let mut response = (
            status,
            Json(ErrorBody {
                error: kind.to_string(),
                message: self.to_string(),
            }),
        )
            .into_response();
        response.extensions_mut().insert(HandlerFault::new(kind));
        response
    }
}

/// Renders a panic caught by `CatchPanicLayer` as a 500 with a fault marker.
pub fn panic_response(payload: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "panic".to_string(),
            message: "Internal server error".to_string(),
        }),
    )
        .into_response();
    response.extensions_mut().insert(HandlerFault::new("panic"));
    response
}
