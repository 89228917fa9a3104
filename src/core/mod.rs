//! Core engine primitives: execution state, checkpointing, and the injected
//! runtime context (time, ids, jitter, sleep).

pub mod checkpoint;
pub mod runtime_context;
pub mod state;

pub use checkpoint::{
    CheckpointError, CheckpointRecord, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore,
};
pub use runtime_context::{IdGenerator, JitterSource, RuntimeContext, Sleeper, TimeProvider};
pub use state::{
    ApprovalDecision, Decision, DeliveryRecord, ExecutionState, InstanceStatus, LineItem,
    NodeOutput, QuoteDraft, StateError, MAX_DECISION_NOTES_LEN,
};
