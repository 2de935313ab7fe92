//! API Error Handling
//!
//! Maps submission failures to HTTP status codes and the `{ ok: false, error }` body.

use super::models::SubmitResponse;
use crate::errors::{StatusCategory, SubmitError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;
use tracing::error;

/// Submission failure tagged with the request that produced it
#[derive(Debug)]
pub struct ApiError {
    pub error: SubmitError,
    pub request_id: String,
}

impl ApiError {
    pub fn new(request_id: String, error: SubmitError) -> Self {
        Self { error, request_id }
    }

    pub fn status(&self) -> StatusCode {
        match self.error.status_category() {
            StatusCategory::ClientValidation => StatusCode::BAD_REQUEST,
            StatusCategory::Server => StatusCode::INTERNAL_SERVER_ERROR,
            StatusCategory::Success => StatusCode::OK,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.request_id, self.error)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(request_id = %self.request_id, error = %self.error, "request failed");
        }
        (status, Json(SubmitResponse::failure(&self.error))).into_response()
    }
}
