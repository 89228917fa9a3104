//! Finalize node: the post-approval pipeline.
//!
//! Runs artifact generation, durable upload, and webhook notification in
//! order. Generation and upload failures propagate so the instance stays
//! re-triggerable; a delivery failure after a successful upload is recorded
//! as a degraded outcome instead of rolling back the stored artifact.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::artifact::ArtifactPipeline;
use crate::core::runtime_context::RuntimeContext;
use crate::core::state::{DeliveryRecord, ExecutionState, NodeOutput};
use crate::delivery::{BlobStore, WebhookDispatcher, WebhookPayload};
use crate::nodes::{NodeError, NodeExecutor};

pub const EVENT_QUOTE_DELIVERED: &str = "quote.delivered";

pub struct FinalizeNodeExecutor {
    pipeline: ArtifactPipeline,
    blob_store: Arc<dyn BlobStore>,
    dispatcher: Arc<WebhookDispatcher>,
}

impl FinalizeNodeExecutor {
    pub fn new(
        pipeline: ArtifactPipeline,
        blob_store: Arc<dyn BlobStore>,
        dispatcher: Arc<WebhookDispatcher>,
    ) -> Self {
        Self {
            pipeline,
            blob_store,
            dispatcher,
        }
    }
}

#[async_trait]
impl NodeExecutor for FinalizeNodeExecutor {
    async fn execute(
        &self,
        instance_id: &str,
        _input: &Value,
        state: &ExecutionState,
        context: &RuntimeContext,
    ) -> Result<NodeOutput, NodeError> {
        let bytes = self.pipeline.generate(state)?;
        let signed = self.blob_store.upload(instance_id, &bytes).await?;
        tracing::info!(
            instance_id,
            url = %signed.url,
            bytes = bytes.len(),
            "artifact uploaded"
        );

        let idempotency_key = format!(
            "{}:{}:{}",
            instance_id,
            EVENT_QUOTE_DELIVERED,
            context.id_generator.next_id()
        );
        let payload = WebhookPayload {
            event: EVENT_QUOTE_DELIVERED.to_string(),
            idempotency_key: idempotency_key.clone(),
            instance_id: instance_id.to_string(),
            artifact_url: signed.url.clone(),
            decision_notes: state
                .decision
                .as_ref()
                .filter(|d| !d.notes.is_empty())
                .map(|d| d.notes.clone()),
        };

        let (delivered, delivery_error) = match self.dispatcher.deliver(&payload).await {
            Ok(()) => (true, None),
            Err(e) => {
                // The artifact is already durable; completion is degraded,
                // not rolled back.
                tracing::warn!(instance_id, error = %e, "webhook delivery failed");
                (false, Some(e.to_string()))
            }
        };

        Ok(NodeOutput::Delivery(DeliveryRecord {
            artifact_url: signed.url,
            expires_at: signed.expires_at,
            idempotency_key,
            delivered,
            delivery_error,
        }))
    }
}
