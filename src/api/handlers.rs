//! Request handlers for the workflow HTTP surface.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;
use super::AppState;
use crate::core::state::{ApprovalDecision, Decision, MAX_DECISION_NOTES_LEN};
use crate::runner::RunResult;

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub draft: Value,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub status: &'static str,
    pub instance_id: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub decision: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub status: &'static str,
    pub instance_id: String,
    pub decision: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WorkflowStatusResponse {
    pub instance_id: String,
    pub status: String,
    pub pending_node: String,
    pub version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn start_workflow(
    State(app): State<AppState>,
    Path(instance_id): Path<String>,
    Json(request): Json<StartRequest>,
) -> Result<(StatusCode, Json<StartResponse>), ApiError> {
    let result = app
        .runner
        .start(&instance_id, request.draft)
        .await
        .map_err(|e| ApiError::from_engine(e, app.expose_errors))?;

    let response = match result {
        RunResult::Suspended { at_gate } => (
            StatusCode::ACCEPTED,
            StartResponse {
                status: "awaiting_review",
                instance_id,
                message: format!("workflow suspended at '{}', awaiting a decision", at_gate),
            },
        ),
        // A retried failed instance that already carried a decision runs
        // straight through.
        RunResult::Completed(_) => (
            StatusCode::OK,
            StartResponse {
                status: "completed",
                instance_id,
                message: "workflow completed".into(),
            },
        ),
        RunResult::Rejected { .. } => (
            StatusCode::OK,
            StartResponse {
                status: "rejected",
                instance_id,
                message: "workflow rejected".into(),
            },
        ),
    };
    Ok((response.0, Json(response.1)))
}

pub async fn resolve_workflow(
    State(app): State<AppState>,
    Path(instance_id): Path<String>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let decision = Decision::parse(&request.decision).ok_or_else(|| {
        ApiError::validation(format!(
            "decision must be one of approve/reject/edit, got '{}'",
            request.decision
        ))
    })?;
    if request.notes.chars().count() > MAX_DECISION_NOTES_LEN {
        return Err(ApiError::validation(format!(
            "notes exceed {} characters",
            MAX_DECISION_NOTES_LEN
        )));
    }

    let result = app
        .runner
        .resume(
            &instance_id,
            ApprovalDecision::new(decision, request.notes),
        )
        .await
        .map_err(|e| ApiError::from_engine(e, app.expose_errors))?;

    let response = match result {
        RunResult::Completed(output) => ResolveResponse {
            status: "completed",
            instance_id,
            decision: decision.to_string(),
            artifact_url: Some(output.artifact_url),
            delivered: Some(output.delivered),
            delivery_error: output.delivery_error,
        },
        RunResult::Rejected { .. } => ResolveResponse {
            status: "rejected",
            instance_id,
            decision: decision.to_string(),
            artifact_url: None,
            delivered: None,
            delivery_error: None,
        },
        RunResult::Suspended { .. } => {
            return Err(ApiError::from_engine(
                crate::error::EngineError::Internal(
                    "resolve left the instance suspended".into(),
                ),
                app.expose_errors,
            ))
        }
    };
    Ok(Json(response))
}

pub async fn get_workflow(
    State(app): State<AppState>,
    Path(instance_id): Path<String>,
) -> Result<Json<WorkflowStatusResponse>, ApiError> {
    let record = app
        .store
        .load(&instance_id)
        .await
        .map_err(|e| ApiError::from_engine(e.into(), app.expose_errors))?
        .ok_or_else(|| {
            ApiError::not_found(format!("no checkpoint found for instance: {}", instance_id))
        })?;

    let delivery = record.state.delivery.as_ref();
    Ok(Json(WorkflowStatusResponse {
        instance_id,
        status: record.status.to_string(),
        pending_node: record.pending_node,
        version: record.version,
        artifact_url: delivery.map(|d| d.artifact_url.clone()),
        delivered: delivery.map(|d| d.delivered),
        delivery_error: delivery.and_then(|d| d.delivery_error.clone()),
    }))
}

pub async fn archive_workflow(
    State(app): State<AppState>,
    Path(instance_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    app.store
        .delete(&instance_id)
        .await
        .map_err(|e| ApiError::from_engine(e.into(), app.expose_errors))?;
    tracing::info!(instance_id, "workflow archived");
    Ok(StatusCode::NO_CONTENT)
}
