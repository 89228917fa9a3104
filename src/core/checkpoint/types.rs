use serde::{Deserialize, Serialize};

use crate::core::state::{ExecutionState, InstanceStatus};

/// Durable snapshot of one workflow instance.
///
/// `version` is a monotonic counter: every successful save is exactly one
/// greater than the stored version, which is how concurrent resumptions of
/// the same instance are detected.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CheckpointRecord {
    pub instance_id: String,
    pub version: u64,
    pub status: InstanceStatus,
    pub pending_node: String,
    pub created_at: i64,
    pub state: ExecutionState,
}

impl CheckpointRecord {
    /// The version the next successful save must carry.
    pub fn next_version(&self) -> u64 {
        self.version + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::{ApprovalDecision, Decision};

    #[test]
    fn test_record_serde_roundtrip() {
        let mut state = ExecutionState::default();
        state.decision = Some(ApprovalDecision::new(Decision::Reject, "too expensive"));
        let record = CheckpointRecord {
            instance_id: "proj-1".into(),
            version: 3,
            status: InstanceStatus::Suspended,
            pending_node: "approval_gate".into(),
            created_at: 1_700_000_000,
            state,
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: CheckpointRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.next_version(), 4);
    }
}
