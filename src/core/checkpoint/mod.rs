//! Checkpoint persistence: the durable snapshot of a suspended or terminal
//! workflow instance, plus the store contract that enforces
//! optimistic-concurrency versioning.

pub mod store;
pub mod types;

pub use store::{CheckpointError, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use types::CheckpointRecord;
