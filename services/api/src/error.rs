//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered as an HTTP response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use checkin_core::CheckInError;
use tracing::error;

use crate::config::ConfigError;
use crate::web::protocol::ErrorResponse;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A check-in outcome other than success.
    #[error("{0}")]
    CheckIn(#[from] CheckInError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error while applying database migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request itself could not be understood.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No caller identity was supplied.
    #[error("Unauthorized")]
    Unauthorized,

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::CheckIn(e) => match e {
                CheckInError::TokenMalformed => (StatusCode::BAD_REQUEST, "token_malformed"),
                CheckInError::TokenExpired => (StatusCode::GONE, "token_expired"),
                CheckInError::EventMismatch => (StatusCode::CONFLICT, "event_mismatch"),
                CheckInError::EventNotLive => (StatusCode::FORBIDDEN, "event_not_live"),
                CheckInError::OutOfRange(_) => (StatusCode::FORBIDDEN, "out_of_range"),
                CheckInError::AlreadyCheckedIn => (StatusCode::CONFLICT, "already_checked_in"),
                CheckInError::EventNotFound(_) => (StatusCode::NOT_FOUND, "event_not_found"),
                CheckInError::NotEventHost => (StatusCode::FORBIDDEN, "not_event_host"),
                CheckInError::TokenIssue(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "token_issue")
                }
                CheckInError::StorageUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable")
                }
            },
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Database(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let distance_meters = match &self {
            ApiError::CheckIn(CheckInError::OutOfRange(d)) => Some(*d),
            _ => None,
        };
        let body = ErrorResponse {
            error: code.to_string(),
            message: self.to_string(),
            distance_meters,
        };
        (status, Json(body)).into_response()
    }
}
