//! # QuoteFlow — A Durable Quote-Approval Workflow Engine
//!
//! `quoteflow` runs a fixed draft → review → deliver workflow with durable
//! suspend/resume semantics:
//!
//! - **Draft**: validate and normalize a quote draft submitted by a client.
//! - **Approval gate**: suspend the instance and persist a checkpoint until a
//!   human reviewer approves, rejects, or requests edits.
//! - **Finalize**: on approval, render the quote artifact, upload it to blob
//!   storage, and deliver an HMAC-signed webhook notification with bounded
//!   exponential-backoff retries.
//!
//! Every transition is persisted through a [`CheckpointStore`] with
//! optimistic version checks, so concurrent resolutions of the same instance
//! produce exactly one winner. Outbound webhook hosts are restricted by a
//! [`HostAllowList`]; time, IDs, jitter, and sleeps are injected through
//! [`RuntimeContext`] so retry behavior is fully deterministic in tests.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use quoteflow::{MemoryBlobStore, MemoryCheckpointStore, RuntimeContext, WorkflowRunner};
//! use quoteflow::delivery::{ReqwestTransport, RetryPolicy, WebhookDispatcher};
//! use quoteflow::security::HostAllowList;
//!
//! #[tokio::main]
//! async fn main() {
//!     let context = RuntimeContext::default();
//!     let transport = ReqwestTransport::new(Duration::from_secs(15)).unwrap();
//!     let dispatcher = WebhookDispatcher::new(
//!         "https://hooks.example.com/quotes",
//!         "secret",
//!         HostAllowList::new(vec!["hooks.example.com".into()]),
//!         RetryPolicy::default(),
//!         Arc::new(transport),
//!         context.clone(),
//!     );
//!     let runner = WorkflowRunner::builder(Arc::new(MemoryCheckpointStore::new()))
//!         .context(context.clone())
//!         .blob_store(Arc::new(MemoryBlobStore::new(
//!             "memory://artifacts",
//!             context.time_provider.clone(),
//!         )))
//!         .dispatcher(Arc::new(dispatcher))
//!         .build()
//!         .unwrap();
//!     let draft = serde_json::json!({
//!         "title": "Q-1001",
//!         "customer": "Acme",
//!         "line_items": [{"description": "Widget", "quantity": 2, "unit_price_cents": 1500}],
//!     });
//!     let result = runner.start("quote-1", draft).await.unwrap();
//!     println!("{:?}", result);
//! }
//! ```

pub mod api;
pub mod artifact;
pub mod config;
pub mod core;
pub mod delivery;
pub mod error;
pub mod graph;
pub mod nodes;
pub mod runner;
pub mod security;

pub use crate::api::{create_router, AppState};
pub use crate::artifact::ArtifactPipeline;
pub use crate::config::{ConfigError, EngineConfig};
pub use crate::core::checkpoint::{
    CheckpointError, CheckpointRecord, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore,
};
pub use crate::core::runtime_context::{
    FakeIdGenerator, FakeTimeProvider, IdGenerator, JitterSource, RuntimeContext, Sleeper,
    TimeProvider,
};
pub use crate::core::state::{
    ApprovalDecision, Decision, DeliveryRecord, ExecutionState, InstanceStatus, QuoteDraft,
};
pub use crate::delivery::{BlobStore, FileBlobStore, MemoryBlobStore, WebhookDispatcher};
pub use crate::error::{EngineError, ErrorCode};
pub use crate::graph::ExecutionGraph;
pub use crate::nodes::{NodeError, NodeExecutor, NodeExecutorRegistry};
pub use crate::runner::{RunResult, WorkflowRunner, WorkflowRunnerBuilder};
pub use crate::security::HostAllowList;
