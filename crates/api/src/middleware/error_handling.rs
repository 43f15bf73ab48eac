//! # Error Handling Middleware
//!
//! Maps the domain `EventError` taxonomy to HTTP status codes and a JSON body
//! of the form `{"error": "<message>"}`, so every handler fails the same way.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eventdesk_core::errors::EventError;
use serde_json::json;
use tracing::error;

/// Application error wrapper that provides HTTP status code mapping
///
/// Handlers return `Result<_, AppError>` and use `?` on anything yielding an
/// `EventError` or an `eyre::Report`.
#[derive(Debug)]
pub struct AppError(pub EventError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            EventError::NotFound(_) => StatusCode::NOT_FOUND,
            EventError::Validation(_) => StatusCode::BAD_REQUEST,
            EventError::Capacity(_) => StatusCode::BAD_REQUEST,
            EventError::Authentication(_) => StatusCode::UNAUTHORIZED,
            EventError::Permission(_) => StatusCode::FORBIDDEN,
            EventError::Conflict(_) => StatusCode::CONFLICT,
            EventError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EventError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side details stay in the log
        let message = if status.is_server_error() {
            error!("Request failed: {:?}", self.0);
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };
        let body = Json(json!({ "error": message }));

        (status, body).into_response()
    }
}

impl From<EventError> for AppError {
    fn from(err: EventError) -> Self {
        AppError(err)
    }
}

/// Unclassified failures are treated as storage errors.
impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(EventError::Database(err))
    }
}

/// Maps an EventError directly to an HTTP response
pub fn map_error(err: EventError) -> Response {
    AppError(err).into_response()
}
