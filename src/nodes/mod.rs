//! Node executors and their registry.

pub mod draft;
pub mod finalize;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::artifact::ArtifactError;
use crate::core::runtime_context::RuntimeContext;
use crate::core::state::{ExecutionState, NodeOutput};
use crate::delivery::BlobError;

pub use draft::DraftNodeExecutor;
pub use finalize::{FinalizeNodeExecutor, EVENT_QUOTE_DELIVERED};

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("Invalid node input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Upload(#[from] BlobError),
}

/// Trait for node execution. Each node type implements this.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Execute the node against the accumulated state. `input` is the
    /// caller-supplied start input; only the draft node reads it.
    async fn execute(
        &self,
        instance_id: &str,
        input: &Value,
        state: &ExecutionState,
        context: &RuntimeContext,
    ) -> Result<NodeOutput, NodeError>;
}

/// Registry of node executors by node name.
pub struct NodeExecutorRegistry {
    executors: HashMap<String, Arc<dyn NodeExecutor>>,
}

impl NodeExecutorRegistry {
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    pub fn register(&mut self, node: &str, executor: Arc<dyn NodeExecutor>) {
        self.executors.insert(node.to_string(), executor);
    }

    pub fn get(&self, node: &str) -> Option<&dyn NodeExecutor> {
        self.executors.get(node).map(|e| e.as_ref())
    }
}

impl Default for NodeExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
