//! The workflow runner: drives one instance through the execution graph,
//! suspends at the approval gate, and resumes from a checkpoint on demand.
//!
//! The approval gate itself never executes as a node — it is the suspension
//! point. The idempotency guard lives in [`WorkflowRunner::resume`]: a
//! decision for an instance that already reached a terminal status is
//! refused with `AlreadyResolved`, and two concurrent resumptions race on
//! the checkpoint version so exactly one wins.

use serde_json::Value;
use std::sync::Arc;

use crate::core::checkpoint::{CheckpointRecord, CheckpointStore};
use crate::core::runtime_context::RuntimeContext;
use crate::core::state::{ApprovalDecision, Decision, ExecutionState, InstanceStatus, NodeOutput};
use crate::delivery::{BlobStore, WebhookDispatcher};
use crate::error::EngineError;
use crate::graph::{ExecutionGraph, RouteOutcome, NODE_DRAFT, NODE_FINALIZE, NODE_TERMINAL};
use crate::nodes::{DraftNodeExecutor, FinalizeNodeExecutor, NodeError, NodeExecutorRegistry};

pub use crate::graph::NODE_APPROVAL_GATE;

/// Outcome of one `start` or `resume` call. Node failures surface through
/// the `Err` arm after the instance is marked `failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum RunResult {
    /// Execution stopped at the approval gate; a checkpoint was persisted.
    Suspended { at_gate: String },
    /// The finalization pipeline ran; see [`CompletedOutput::delivered`] for
    /// the degraded completed-but-undelivered case.
    Completed(CompletedOutput),
    /// The reviewer declined (or asked for edits); nothing was finalized.
    Rejected { decision: Decision, notes: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedOutput {
    pub artifact_url: String,
    pub expires_at: i64,
    pub delivered: bool,
    pub delivery_error: Option<String>,
}

impl From<NodeError> for EngineError {
    fn from(value: NodeError) -> Self {
        match value {
            NodeError::InvalidInput(msg) => EngineError::Validation(msg),
            NodeError::Artifact(e) => EngineError::Artifact(e),
            NodeError::Upload(e) => EngineError::Upload(e),
        }
    }
}

/// Drives instances through the graph. Construct via [`WorkflowRunner::builder`].
pub struct WorkflowRunner {
    graph: ExecutionGraph,
    registry: NodeExecutorRegistry,
    store: Arc<dyn CheckpointStore>,
    context: RuntimeContext,
}

impl std::fmt::Debug for WorkflowRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRunner").finish_non_exhaustive()
    }
}

impl WorkflowRunner {
    pub fn builder(store: Arc<dyn CheckpointStore>) -> WorkflowRunnerBuilder {
        WorkflowRunnerBuilder {
            store,
            graph: ExecutionGraph::standard(),
            context: RuntimeContext::default(),
            blob_store: None,
            dispatcher: None,
        }
    }

    pub fn graph(&self) -> &ExecutionGraph {
        &self.graph
    }

    /// Start a new instance (or retry a failed one) with the caller-supplied
    /// draft input. Runs until the gate suspends execution.
    pub async fn start(&self, instance_id: &str, input: Value) -> Result<RunResult, EngineError> {
        match self.store.load(instance_id).await? {
            Some(record) if record.status.is_resolved() => Err(EngineError::AlreadyResolved {
                instance_id: instance_id.to_string(),
                status: record.status,
            }),
            Some(record) if record.status == InstanceStatus::Suspended => {
                // Start is idempotent while the instance awaits review.
                Ok(RunResult::Suspended {
                    at_gate: record.pending_node,
                })
            }
            Some(record) if record.status == InstanceStatus::Running => {
                Err(EngineError::InFlight {
                    instance_id: instance_id.to_string(),
                })
            }
            Some(record) => {
                tracing::info!(instance_id, "retrying failed instance");
                self.run_loop(instance_id, record.state, record.version, input)
                    .await
            }
            None => {
                tracing::info!(instance_id, "starting workflow instance");
                self.run_loop(instance_id, ExecutionState::default(), 0, input)
                    .await
            }
        }
    }

    /// Apply an external decision to a suspended instance and run to a
    /// terminal state within this call.
    pub async fn resume(
        &self,
        instance_id: &str,
        decision: ApprovalDecision,
    ) -> Result<RunResult, EngineError> {
        let record = self
            .store
            .load(instance_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(instance_id.to_string()))?;

        match record.status {
            InstanceStatus::Completed | InstanceStatus::Rejected => {
                Err(EngineError::AlreadyResolved {
                    instance_id: instance_id.to_string(),
                    status: record.status,
                })
            }
            InstanceStatus::Suspended => {
                let mut state = record.state;
                // The decision must be visible to the very first routing
                // decision after resumption.
                state.merge(NodeOutput::Decision(decision))?;

                let pending = match self.graph.route(&state) {
                    RouteOutcome::Execute(node) => node,
                    _ => NODE_TERMINAL,
                };
                let version = record.version + 1;
                // Losing this save is how a concurrent resume is detected.
                self.persist(instance_id, InstanceStatus::Running, pending, version, &state)
                    .await?;
                tracing::info!(instance_id, "decision accepted, resuming");
                self.run_loop(instance_id, state, version, Value::Null).await
            }
            InstanceStatus::Running => {
                if record.state.decision.is_some() {
                    // Finalization was interrupted (crash or upload failure);
                    // re-trigger it without re-approving. The version bump
                    // claims the checkpoint first, so a concurrent re-trigger
                    // loses here rather than after its side effects.
                    let version = record.version + 1;
                    self.persist(
                        instance_id,
                        InstanceStatus::Running,
                        NODE_FINALIZE,
                        version,
                        &record.state,
                    )
                    .await?;
                    tracing::info!(instance_id, "re-entering finalization");
                    self.run_loop(instance_id, record.state, version, Value::Null)
                        .await
                } else {
                    Err(EngineError::Validation(format!(
                        "instance '{}' is running and not awaiting a decision",
                        instance_id
                    )))
                }
            }
            InstanceStatus::Failed => {
                // A pre-gate failure never presented a draft for review, so
                // there is nothing a decision could apply to. Only `start`
                // with corrected input moves the instance forward.
                if record.state.draft.is_none() {
                    return Err(EngineError::Validation(format!(
                        "instance '{}' failed before reaching the gate; \
                         restart it with corrected input",
                        instance_id
                    )));
                }
                let mut state = record.state;
                if state.decision.is_none() {
                    state.merge(NodeOutput::Decision(decision))?;
                }
                tracing::info!(instance_id, "retrying failed instance with decision");
                self.run_loop(instance_id, state, record.version, Value::Null)
                    .await
            }
        }
    }

    async fn run_loop(
        &self,
        instance_id: &str,
        mut state: ExecutionState,
        mut version: u64,
        input: Value,
    ) -> Result<RunResult, EngineError> {
        loop {
            match self.graph.route(&state) {
                RouteOutcome::Suspend => {
                    version += 1;
                    self.persist(
                        instance_id,
                        InstanceStatus::Suspended,
                        self.graph.gate_node(),
                        version,
                        &state,
                    )
                    .await?;
                    tracing::info!(instance_id, gate = self.graph.gate_node(), "suspended");
                    return Ok(RunResult::Suspended {
                        at_gate: self.graph.gate_node().to_string(),
                    });
                }
                RouteOutcome::Terminal => {
                    version += 1;
                    self.persist(
                        instance_id,
                        InstanceStatus::Rejected,
                        NODE_TERMINAL,
                        version,
                        &state,
                    )
                    .await?;
                    let decision = state.decision.as_ref().ok_or_else(|| {
                        EngineError::Internal("terminal path without a decision".into())
                    })?;
                    tracing::info!(instance_id, decision = %decision.decision, "rejected");
                    return Ok(RunResult::Rejected {
                        decision: decision.decision,
                        notes: decision.notes.clone(),
                    });
                }
                RouteOutcome::Complete => {
                    version += 1;
                    self.persist(
                        instance_id,
                        InstanceStatus::Completed,
                        NODE_TERMINAL,
                        version,
                        &state,
                    )
                    .await?;
                    let record = state.delivery.as_ref().ok_or_else(|| {
                        EngineError::Internal("completed without a delivery record".into())
                    })?;
                    tracing::info!(
                        instance_id,
                        delivered = record.delivered,
                        "completed"
                    );
                    return Ok(RunResult::Completed(CompletedOutput {
                        artifact_url: record.artifact_url.clone(),
                        expires_at: record.expires_at,
                        delivered: record.delivered,
                        delivery_error: record.delivery_error.clone(),
                    }));
                }
                RouteOutcome::Execute(node) => {
                    let executor = self.registry.get(node).ok_or_else(|| {
                        EngineError::Internal(format!("no executor registered for node '{}'", node))
                    })?;

                    match executor
                        .execute(instance_id, &input, &state, &self.context)
                        .await
                    {
                        Ok(output) => state.merge(output)?,
                        Err(e) => {
                            // Finalize failures stay `running` so the caller
                            // can re-trigger from this step; pre-gate
                            // failures mark the instance failed and are
                            // retryable via start/resume.
                            let status = if node == NODE_FINALIZE {
                                InstanceStatus::Running
                            } else {
                                InstanceStatus::Failed
                            };
                            version += 1;
                            self.persist(instance_id, status, node, version, &state)
                                .await?;
                            tracing::warn!(instance_id, node, error = %e, "node execution failed");
                            return Err(e.into());
                        }
                    }
                }
            }
        }
    }

    async fn persist(
        &self,
        instance_id: &str,
        status: InstanceStatus,
        pending_node: &str,
        version: u64,
        state: &ExecutionState,
    ) -> Result<(), EngineError> {
        let record = CheckpointRecord {
            instance_id: instance_id.to_string(),
            version,
            status,
            pending_node: pending_node.to_string(),
            created_at: self.context.time_provider.now_timestamp(),
            state: state.clone(),
        };
        self.store.save(&record).await?;
        Ok(())
    }
}

/// Builder wiring the runner's collaborators. The blob store and webhook
/// dispatcher are required because the finalize node needs them.
pub struct WorkflowRunnerBuilder {
    store: Arc<dyn CheckpointStore>,
    graph: ExecutionGraph,
    context: RuntimeContext,
    blob_store: Option<Arc<dyn BlobStore>>,
    dispatcher: Option<Arc<WebhookDispatcher>>,
}

impl WorkflowRunnerBuilder {
    pub fn graph(mut self, graph: ExecutionGraph) -> Self {
        self.graph = graph;
        self
    }

    pub fn context(mut self, context: RuntimeContext) -> Self {
        self.context = context;
        self
    }

    pub fn blob_store(mut self, blob_store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(blob_store);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<WebhookDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn build(self) -> Result<WorkflowRunner, EngineError> {
        let blob_store = self
            .blob_store
            .ok_or_else(|| EngineError::Configuration("runner requires a blob store".into()))?;
        let dispatcher = self.dispatcher.ok_or_else(|| {
            EngineError::Configuration("runner requires a webhook dispatcher".into())
        })?;

        let mut registry = NodeExecutorRegistry::new();
        registry.register(NODE_DRAFT, Arc::new(DraftNodeExecutor));
        registry.register(
            NODE_FINALIZE,
            Arc::new(FinalizeNodeExecutor::new(
                crate::artifact::ArtifactPipeline::new(),
                blob_store,
                dispatcher,
            )),
        );

        Ok(WorkflowRunner {
            graph: self.graph,
            registry,
            store: self.store,
            context: self.context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::checkpoint::{CheckpointError, MemoryCheckpointStore};
    use crate::delivery::webhook::TransportError;
    use crate::delivery::{MemoryBlobStore, RetryPolicy, WebhookTransport};
    use crate::security::HostAllowList;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingTransport {
        status: u16,
        calls: AtomicU32,
    }

    impl CountingTransport {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                status: 200,
                calls: AtomicU32::new(0),
            })
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WebhookTransport for CountingTransport {
        async fn post(
            &self,
            _url: &str,
            _headers: &[(String, String)],
            _body: &str,
        ) -> Result<u16, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.status)
        }
    }

    fn draft_input() -> Value {
        serde_json::json!({
            "title": "Website redesign",
            "customer": "Acme Corp",
            "line_items": [
                {"description": "Design", "quantity": 1, "unit_price_cents": 50000}
            ],
            "currency": "USD"
        })
    }

    struct Fixture {
        runner: WorkflowRunner,
        store: Arc<MemoryCheckpointStore>,
        transport: Arc<CountingTransport>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryCheckpointStore::new());
        let context = RuntimeContext::fake(1_700_000_000, "uuid");
        let transport = CountingTransport::ok();
        let blob = Arc::new(MemoryBlobStore::new(
            "https://blobs.example.com",
            context.time_provider.clone(),
        ));
        let dispatcher = Arc::new(WebhookDispatcher::new(
            "https://hooks.example.com/deliver",
            "secret",
            HostAllowList::new(vec!["hooks.example.com".into()]),
            RetryPolicy::default(),
            transport.clone(),
            context.clone(),
        ));
        let runner = WorkflowRunner::builder(store.clone())
            .context(context)
            .blob_store(blob)
            .dispatcher(dispatcher)
            .build()
            .unwrap();
        Fixture {
            runner,
            store,
            transport,
        }
    }

    #[tokio::test]
    async fn test_start_suspends_at_gate() {
        let f = fixture();
        let result = f.runner.start("proj-1", draft_input()).await.unwrap();
        assert_eq!(
            result,
            RunResult::Suspended {
                at_gate: NODE_APPROVAL_GATE.to_string()
            }
        );

        let record = f.store.load("proj-1").await.unwrap().unwrap();
        assert_eq!(record.status, InstanceStatus::Suspended);
        assert_eq!(record.version, 1);
        assert_eq!(record.pending_node, NODE_APPROVAL_GATE);
        assert!(record.state.draft.is_some());
    }

    #[tokio::test]
    async fn test_start_is_idempotent_while_suspended() {
        let f = fixture();
        f.runner.start("proj-1", draft_input()).await.unwrap();
        let again = f.runner.start("proj-1", draft_input()).await.unwrap();
        assert!(matches!(again, RunResult::Suspended { .. }));
        // No second checkpoint write happened.
        assert_eq!(f.store.load("proj-1").await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_approve_completes_and_delivers_once() {
        let f = fixture();
        f.runner.start("proj-1", draft_input()).await.unwrap();
        let result = f
            .runner
            .resume("proj-1", ApprovalDecision::new(Decision::Approve, "ok"))
            .await
            .unwrap();

        let RunResult::Completed(output) = result else {
            panic!("expected completion");
        };
        assert!(output.delivered);
        assert!(output
            .artifact_url
            .starts_with("https://blobs.example.com/"));
        assert_eq!(f.transport.call_count(), 1);

        let record = f.store.load("proj-1").await.unwrap().unwrap();
        assert_eq!(record.status, InstanceStatus::Completed);
        // suspend(1) -> decision accepted(2) -> completed(3)
        assert_eq!(record.version, 3);
    }

    #[tokio::test]
    async fn test_reject_terminates_without_side_effects() {
        let f = fixture();
        f.runner.start("proj-2", draft_input()).await.unwrap();
        let result = f
            .runner
            .resume(
                "proj-2",
                ApprovalDecision::new(Decision::Reject, "too expensive"),
            )
            .await
            .unwrap();

        assert_eq!(
            result,
            RunResult::Rejected {
                decision: Decision::Reject,
                notes: "too expensive".into()
            }
        );
        assert_eq!(f.transport.call_count(), 0);
        let record = f.store.load("proj-2").await.unwrap().unwrap();
        assert_eq!(record.status, InstanceStatus::Rejected);
    }

    #[tokio::test]
    async fn test_edit_treated_as_terminal() {
        let f = fixture();
        f.runner.start("proj-3", draft_input()).await.unwrap();
        let result = f
            .runner
            .resume("proj-3", ApprovalDecision::new(Decision::Edit, "tweak it"))
            .await
            .unwrap();
        assert!(matches!(
            result,
            RunResult::Rejected {
                decision: Decision::Edit,
                ..
            }
        ));
        assert_eq!(f.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_second_resolution_refused() {
        let f = fixture();
        f.runner.start("proj-1", draft_input()).await.unwrap();
        f.runner
            .resume("proj-1", ApprovalDecision::new(Decision::Approve, "ok"))
            .await
            .unwrap();

        let err = f
            .runner
            .resume("proj-1", ApprovalDecision::new(Decision::Approve, "again"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::AlreadyResolved {
                status: InstanceStatus::Completed,
                ..
            }
        ));
        // Delivery count unchanged by the replayed approval.
        assert_eq!(f.transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_resume_unknown_instance() {
        let f = fixture();
        let err = f
            .runner
            .resume("ghost", ApprovalDecision::new(Decision::Approve, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resume_loses_version_race() {
        let f = fixture();
        f.runner.start("proj-1", draft_input()).await.unwrap();

        // Interleave: a competing resume wins right after ours loads.
        struct RacingStore {
            inner: Arc<MemoryCheckpointStore>,
            raced: AtomicU32,
        }

        #[async_trait]
        impl CheckpointStore for RacingStore {
            async fn save(&self, record: &CheckpointRecord) -> Result<(), CheckpointError> {
                self.inner.save(record).await
            }

            async fn load(
                &self,
                instance_id: &str,
            ) -> Result<Option<CheckpointRecord>, CheckpointError> {
                let loaded = self.inner.load(instance_id).await?;
                if self.raced.fetch_add(1, Ordering::SeqCst) == 0 {
                    // A rival resume commits between our load and save.
                    if let Some(mut rival) = loaded.clone() {
                        rival.version += 1;
                        rival.status = InstanceStatus::Running;
                        rival.state.decision =
                            Some(ApprovalDecision::new(Decision::Approve, "rival"));
                        self.inner.save(&rival).await?;
                    }
                }
                Ok(loaded)
            }

            async fn delete(&self, instance_id: &str) -> Result<(), CheckpointError> {
                self.inner.delete(instance_id).await
            }
        }

        let racing = Arc::new(RacingStore {
            inner: f.store.clone(),
            raced: AtomicU32::new(0),
        });
        let context = RuntimeContext::fake(1_700_000_000, "uuid");
        let blob = Arc::new(MemoryBlobStore::new(
            "https://blobs.example.com",
            context.time_provider.clone(),
        ));
        let dispatcher = Arc::new(WebhookDispatcher::new(
            "https://hooks.example.com/deliver",
            "secret",
            HostAllowList::new(vec!["hooks.example.com".into()]),
            RetryPolicy::default(),
            CountingTransport::ok(),
            context.clone(),
        ));
        let racing_runner = WorkflowRunner::builder(racing)
            .context(context)
            .blob_store(blob)
            .dispatcher(dispatcher)
            .build()
            .unwrap();

        let err = racing_runner
            .resume("proj-1", ApprovalDecision::new(Decision::Approve, "ok"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Checkpoint(CheckpointError::VersionConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_start_bad_input_marks_failed_and_is_retryable() {
        let f = fixture();
        let err = f
            .runner
            .start("proj-1", serde_json::json!({"title": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(
            f.store.load("proj-1").await.unwrap().unwrap().status,
            InstanceStatus::Failed
        );

        // Operator retries with corrected input.
        let result = f.runner.start("proj-1", draft_input()).await.unwrap();
        assert!(matches!(result, RunResult::Suspended { .. }));
    }

    #[tokio::test]
    async fn test_resume_refused_before_gate_reached() {
        let f = fixture();
        let err = f
            .runner
            .start("proj-1", serde_json::json!({"title": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        // The instance failed before any draft existed; a decision has
        // nothing to approve.
        let err = f
            .runner
            .resume("proj-1", ApprovalDecision::new(Decision::Approve, "lgtm"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        let record = f.store.load("proj-1").await.unwrap().unwrap();
        assert_eq!(record.status, InstanceStatus::Failed);
        assert!(record.state.decision.is_none());

        // Corrected input still suspends at the gate; nothing was delivered.
        let result = f.runner.start("proj-1", draft_input()).await.unwrap();
        assert!(matches!(result, RunResult::Suspended { .. }));
        assert_eq!(f.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_start_on_running_instance_is_busy() {
        let f = fixture();
        f.store
            .save(&CheckpointRecord {
                instance_id: "proj-1".into(),
                version: 1,
                status: InstanceStatus::Running,
                pending_node: NODE_FINALIZE.into(),
                created_at: 0,
                state: ExecutionState::default(),
            })
            .await
            .unwrap();

        let err = f.runner.start("proj-1", draft_input()).await.unwrap_err();
        assert!(matches!(err, EngineError::InFlight { .. }));
    }

    #[tokio::test]
    async fn test_refinalize_claims_checkpoint_before_side_effects() {
        use crate::delivery::blob::{BlobError, SignedUrl};

        // Upload fails on the first finalization, leaving the instance
        // running with a decision.
        struct FailingOnceBlobStore {
            inner: MemoryBlobStore,
            uploads: AtomicU32,
        }

        #[async_trait]
        impl BlobStore for FailingOnceBlobStore {
            async fn upload(
                &self,
                instance_id: &str,
                bytes: &[u8],
            ) -> Result<SignedUrl, BlobError> {
                if self.uploads.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(BlobError::UploadFailed("disk full".into()));
                }
                self.inner.upload(instance_id, bytes).await
            }

            async fn fetch(&self, instance_id: &str) -> Result<Option<Vec<u8>>, BlobError> {
                self.inner.fetch(instance_id).await
            }
        }

        // A rival re-trigger commits between our load and our claim.
        struct RivalStore {
            inner: Arc<MemoryCheckpointStore>,
            raced: AtomicU32,
        }

        #[async_trait]
        impl CheckpointStore for RivalStore {
            async fn save(&self, record: &CheckpointRecord) -> Result<(), CheckpointError> {
                self.inner.save(record).await
            }

            async fn load(
                &self,
                instance_id: &str,
            ) -> Result<Option<CheckpointRecord>, CheckpointError> {
                let loaded = self.inner.load(instance_id).await?;
                if self.raced.fetch_add(1, Ordering::SeqCst) == 0 {
                    if let Some(mut rival) = loaded.clone() {
                        rival.version += 1;
                        self.inner.save(&rival).await?;
                    }
                }
                Ok(loaded)
            }

            async fn delete(&self, instance_id: &str) -> Result<(), CheckpointError> {
                self.inner.delete(instance_id).await
            }
        }

        let store = Arc::new(MemoryCheckpointStore::new());
        let context = RuntimeContext::fake(1_700_000_000, "uuid");
        let transport = CountingTransport::ok();
        let blob = Arc::new(FailingOnceBlobStore {
            inner: MemoryBlobStore::new(
                "https://blobs.example.com",
                context.time_provider.clone(),
            ),
            uploads: AtomicU32::new(0),
        });
        let dispatcher = Arc::new(WebhookDispatcher::new(
            "https://hooks.example.com/deliver",
            "secret",
            HostAllowList::new(vec!["hooks.example.com".into()]),
            RetryPolicy::default(),
            transport.clone(),
            context.clone(),
        ));
        let runner = WorkflowRunner::builder(store.clone())
            .context(context.clone())
            .blob_store(blob.clone())
            .dispatcher(dispatcher.clone())
            .build()
            .unwrap();

        runner.start("proj-1", draft_input()).await.unwrap();
        let err = runner
            .resume("proj-1", ApprovalDecision::new(Decision::Approve, "ok"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Upload(_)));
        let record = store.load("proj-1").await.unwrap().unwrap();
        assert_eq!(record.status, InstanceStatus::Running);
        assert!(record.state.decision.is_some());

        let rival = Arc::new(RivalStore {
            inner: store.clone(),
            raced: AtomicU32::new(0),
        });
        let racing_runner = WorkflowRunner::builder(rival)
            .context(context)
            .blob_store(blob.clone())
            .dispatcher(dispatcher)
            .build()
            .unwrap();
        let err = racing_runner
            .resume("proj-1", ApprovalDecision::new(Decision::Approve, "ok"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Checkpoint(CheckpointError::VersionConflict { .. })
        ));
        // The loser ran no side effects: no second upload, no webhook.
        assert_eq!(blob.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_builder_requires_collaborators() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let err = WorkflowRunner::builder(store).build().unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
