//! Centralized error types for the mediator core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

/// Application-wide error type for the mediator.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum MediatorError {
    /// Missing mandatory credential or an unknown provider id: fails fast at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Webhook body did not match the closed event envelope shape.
    #[error("Malformed webhook payload: {0}")]
    MalformedWebhook(String),

    /// Referenced session does not exist.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Provider adapter's `open` returned an init error; fatal for the session.
    #[error("Provider init failed: {0}")]
    ProviderInit(String),

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediatorError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::MalformedWebhook(_) => "malformed_webhook",
            Self::SessionNotFound(_) => "session_not_found",
            Self::ProviderInit(_) => "provider_init_failed",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedWebhook(_) => StatusCode::BAD_REQUEST,
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ProviderInit(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ErrorCode for MediatorError {
    fn code(&self) -> &'static str {
        MediatorError::code(self)
    }
}

/// Convenient Result alias for application-wide operations.
pub type MediatorResult<T> = Result<T, MediatorError>;

/// JSON response body for error responses: `{error, details}` (§4.5, §7).
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    details: String,
}

impl IntoResponse for MediatorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            details: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
