//! Router configuration.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::{handlers, AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/workflow/:id/start", post(handlers::start_workflow))
        .route("/workflow/:id/resolve", post(handlers::resolve_workflow))
        .route("/workflow/:id", get(handlers::get_workflow))
        .route("/workflow/:id/archive", post(handlers::archive_workflow))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
