//! Crate-level error taxonomy.
//!
//! Module-local errors (`CheckpointError`, `ArtifactError`, `BlobError`,
//! `DeliveryError`, `StateError`) converge into [`EngineError`], and every
//! engine error classifies itself as an [`ErrorCode`] — the stable
//! machine-readable code callers see. Raw internal messages are only exposed
//! when the configuration allows it.

use serde::Serialize;
use thiserror::Error;

use crate::artifact::ArtifactError;
use crate::core::checkpoint::CheckpointError;
use crate::core::state::{InstanceStatus, StateError};
use crate::delivery::{BlobError, DeliveryError};

/// Stable machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    AlreadyResolved,
    InstanceBusy,
    CheckpointConflict,
    CheckpointUnavailable,
    ArtifactGenerationError,
    ArtifactUploadError,
    DeliveryError,
    ConfigError,
    ValidationError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::AlreadyResolved => "already_resolved",
            ErrorCode::InstanceBusy => "instance_busy",
            ErrorCode::CheckpointConflict => "checkpoint_conflict",
            ErrorCode::CheckpointUnavailable => "checkpoint_unavailable",
            ErrorCode::ArtifactGenerationError => "artifact_generation_error",
            ErrorCode::ArtifactUploadError => "artifact_upload_error",
            ErrorCode::DeliveryError => "delivery_error",
            ErrorCode::ConfigError => "config_error",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

/// Engine-level errors surfaced by the workflow runner.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No checkpoint found for instance: {0}")]
    NotFound(String),
    #[error("Instance '{instance_id}' is already resolved with status '{status}'")]
    AlreadyResolved {
        instance_id: String,
        status: InstanceStatus,
    },
    #[error("Instance '{instance_id}' is currently running")]
    InFlight { instance_id: String },
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Upload(#[from] BlobError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::NotFound(_) => ErrorCode::NotFound,
            EngineError::AlreadyResolved { .. } => ErrorCode::AlreadyResolved,
            EngineError::InFlight { .. } => ErrorCode::InstanceBusy,
            EngineError::Checkpoint(CheckpointError::VersionConflict { .. }) => {
                ErrorCode::CheckpointConflict
            }
            EngineError::Checkpoint(CheckpointError::NotFound(_)) => ErrorCode::NotFound,
            EngineError::Checkpoint(_) => ErrorCode::CheckpointUnavailable,
            EngineError::Artifact(_) => ErrorCode::ArtifactGenerationError,
            EngineError::Upload(_) => ErrorCode::ArtifactUploadError,
            EngineError::Delivery(DeliveryError::Configuration(_)) => ErrorCode::ConfigError,
            EngineError::Delivery(_) => ErrorCode::DeliveryError,
            EngineError::State(StateError::NotesTooLong { .. }) => ErrorCode::ValidationError,
            EngineError::State(_) => ErrorCode::InternalError,
            EngineError::Configuration(_) => ErrorCode::ConfigError,
            EngineError::Validation(_) => ErrorCode::ValidationError,
            EngineError::Internal(_) => ErrorCode::InternalError,
        }
    }
}
