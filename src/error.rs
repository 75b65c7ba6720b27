//! Application error taxonomy and its translation into HTTP responses.
//!
//! Every handler and middleware returns [`AppError`]. The errors middleware
//! ([`crate::api::middleware::errors`]) is the single place where an error is
//! classified into a status code and a client-visible body:
//!
//! 1. [`AppError::Validation`] - field-level problems, `400`
//! 2. Explicit request kinds ([`AppError::Request`], `Unauthorized`,
//!    `Forbidden`, `NotFound`, `Conflict`) - their own status and message
//! 3. Everything else - opaque `500` (or `503` for cancelled requests)
//!
//! [`AppError::Shutdown`] is the only kind that escalates past the response:
//! the router turns it into a termination signal.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use validator::ValidationErrors;

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

/// A single invalid field in a request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("data validation error")]
    Validation { fields: Vec<FieldError> },
    #[error("{message}")]
    Request { status: StatusCode, message: String },
    #[error("{message}")]
    Unauthorized { message: String },
    #[error("{message}")]
    Forbidden { message: String },
    #[error("{message}")]
    NotFound { message: String },
    #[error("{message}")]
    Conflict { message: String },
    #[error("request cancelled")]
    RequestCancelled,
    /// Unrecoverable failure; the router signals process shutdown.
    #[error("shutdown requested: {message}")]
    Shutdown { message: String },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(fields: Vec<FieldError>) -> Self {
        Self::Validation { fields }
    }
    pub fn request(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Request {
            status,
            message: message.into(),
        }
    }
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::request(StatusCode::BAD_REQUEST, message)
    }
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown {
            message: message.into(),
        }
    }
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(anyhow::anyhow!(message.into()))
    }

    /// Returns `true` for the kind that must trigger process shutdown.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown { .. })
    }

    /// HTTP status this error is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Request { status, .. } => *status,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::RequestCancelled => StatusCode::SERVICE_UNAVAILABLE,
            Self::Shutdown { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-visible error description.
    ///
    /// Internal and shutdown errors are reduced to the canonical status text so
    /// no internal detail reaches the client.
    pub fn to_error_info(&self) -> ErrorInfo {
        let status = self.status();
        let (code, message, details) = match self {
            Self::Validation { fields } => (
                "validation_error",
                self.to_string(),
                serde_json::to_value(fields).unwrap_or(Value::Null),
            ),
            Self::Request { message, .. } => ("request_error", message.clone(), json!({})),
            Self::Unauthorized { message } => ("unauthorized", message.clone(), json!({})),
            Self::Forbidden { message } => ("forbidden", message.clone(), json!({})),
            Self::NotFound { message } => ("not_found", message.clone(), json!({})),
            Self::Conflict { message } => ("conflict", message.clone(), json!({})),
            Self::RequestCancelled => ("request_cancelled", self.to_string(), json!({})),
            Self::Shutdown { .. } | Self::Internal(_) => (
                "internal_error",
                status
                    .canonical_reason()
                    .unwrap_or("Internal Server Error")
                    .to_string(),
                json!({}),
            ),
        };

        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    error: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));

        Self::validation(fields)
    }
}

impl AppError {
    /// Builds the client response without consuming the error.
    pub fn to_response(&self) -> Response {
        let body = ErrorBody {
            error: self.to_error_info(),
        };

        let mut response = (self.status(), Json(body)).into_response();

        // RFC 6750
        if matches!(self, Self::Unauthorized { .. }) {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }

        response
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_response()
    }
}
