//! HTTP surface: start and resolve workflow instances, inspect status, and
//! archive completed ones.

pub mod error;
pub mod handlers;
pub mod routes;

use std::sync::Arc;

use crate::core::checkpoint::CheckpointStore;
use crate::runner::WorkflowRunner;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;

/// Shared state injected into every handler. The runner and graph are
/// explicit dependencies, not process-wide singletons.
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<WorkflowRunner>,
    pub store: Arc<dyn CheckpointStore>,
    pub expose_errors: bool,
}
