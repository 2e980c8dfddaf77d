// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::backend::BackendError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Errors returned by the credential store.
///
/// These never carry tokens or passwords; `Rejected` holds the backend's
/// message for logging only and is not shown to end users.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("No authenticated user")]
    Unauthenticated,

    #[error("Token exchange rejected: {0}")]
    ExchangeFailed(String),

    #[error("Identity backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Request rejected by identity backend: {0}")]
    Rejected(String),
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Session exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::Unauthenticated => AppError::Unauthenticated,
            AuthError::ExchangeFailed(msg) => AppError::ExchangeFailed(msg),
            AuthError::BackendUnavailable(msg) => AppError::BackendUnavailable(msg),
            AuthError::Rejected(msg) => AppError::BadRequest(msg),
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Rejected { status: 401, .. } => AppError::Unauthenticated,
            BackendError::Rejected { status, message } => {
                AppError::Database(format!("HTTP {}: {}", status, message))
            }
            BackendError::Unavailable(msg) => AppError::BackendUnavailable(msg),
            BackendError::Decode(msg) => AppError::Database(msg),
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated", None),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid_credentials", None)
            }
            AppError::ExchangeFailed(msg) => {
                tracing::warn!(error = %msg, "Session exchange failed");
                (StatusCode::UNAUTHORIZED, "exchange_failed", None)
            }
            AppError::BackendUnavailable(msg) => {
                tracing::error!(error = %msg, "Backend unavailable");
                (StatusCode::BAD_GATEWAY, "backend_unavailable", None)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
