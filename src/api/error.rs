//! HTTP error mapping.
//!
//! Every engine error maps to a stable machine-readable code plus a
//! human-readable message. In production mode (`expose_errors = false`) the
//! raw text of server-side failures is replaced with a generic message; the
//! code is always preserved.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{EngineError, ErrorCode};

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: ErrorCode::ValidationError,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: ErrorCode::NotFound,
            message: message.into(),
        }
    }

    /// Map an engine error, redacting server-side detail unless
    /// `expose_errors` is set.
    pub fn from_engine(error: EngineError, expose_errors: bool) -> Self {
        let code = error.code();
        let status = status_for(code);
        let message = if status.is_server_error() && !expose_errors {
            generic_message(code).to_string()
        } else {
            error.to_string()
        };
        Self {
            status,
            code,
            message,
        }
    }
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::AlreadyResolved | ErrorCode::InstanceBusy => StatusCode::CONFLICT,
        ErrorCode::CheckpointConflict | ErrorCode::CheckpointUnavailable => StatusCode::BAD_GATEWAY,
        ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::ArtifactGenerationError
        | ErrorCode::ArtifactUploadError
        | ErrorCode::DeliveryError
        | ErrorCode::ConfigError
        | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn generic_message(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::CheckpointConflict => "checkpoint version conflict",
        ErrorCode::CheckpointUnavailable => "checkpoint persistence failed",
        ErrorCode::ArtifactGenerationError => "artifact generation failed",
        ErrorCode::ArtifactUploadError => "artifact upload failed",
        ErrorCode::DeliveryError => "webhook delivery failed",
        ErrorCode::ConfigError => "engine misconfiguration",
        _ => "internal error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
