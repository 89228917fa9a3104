//! Draft node: normalizes the caller-supplied quote content into a
//! [`QuoteDraft`]. Re-running it is an idempotent re-computation; the agent
//! that authors the content lives outside this engine.

use async_trait::async_trait;
use serde_json::Value;

use crate::core::runtime_context::RuntimeContext;
use crate::core::state::{ExecutionState, NodeOutput, QuoteDraft};
use crate::nodes::{NodeError, NodeExecutor};

pub struct DraftNodeExecutor;

#[async_trait]
impl NodeExecutor for DraftNodeExecutor {
    async fn execute(
        &self,
        instance_id: &str,
        input: &Value,
        _state: &ExecutionState,
        _context: &RuntimeContext,
    ) -> Result<NodeOutput, NodeError> {
        let mut draft: QuoteDraft = serde_json::from_value(input.clone())
            .map_err(|e| NodeError::InvalidInput(e.to_string()))?;

        draft.title = draft.title.trim().to_string();
        draft.customer = draft.customer.trim().to_string();
        if draft.title.is_empty() {
            return Err(NodeError::InvalidInput("draft title is empty".into()));
        }
        if draft.customer.is_empty() {
            return Err(NodeError::InvalidInput("draft customer is empty".into()));
        }
        if draft.line_items.is_empty() {
            return Err(NodeError::InvalidInput("draft has no line items".into()));
        }
        if draft.currency.trim().is_empty() {
            draft.currency = "USD".to_string();
        }

        tracing::debug!(instance_id, title = %draft.title, "draft normalized");
        Ok(NodeOutput::Draft(draft))
    }
}
