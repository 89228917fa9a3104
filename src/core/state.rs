//! Execution state accumulated across workflow steps.
//!
//! Each node owns exactly one field of [`ExecutionState`]. Outputs are merged
//! through [`ExecutionState::merge`], which refuses to overwrite a field that
//! was already produced by an earlier step. The only value a human may set is
//! the approval decision, and only once.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length accepted for reviewer notes.
pub const MAX_DECISION_NOTES_LEN: usize = 2000;

/// Lifecycle status of a workflow instance.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Running,
    Suspended,
    Completed,
    Rejected,
    Failed,
}

impl InstanceStatus {
    /// Terminal statuses refuse further decisions.
    pub fn is_resolved(&self) -> bool {
        matches!(self, InstanceStatus::Completed | InstanceStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Running => "running",
            InstanceStatus::Suspended => "suspended",
            InstanceStatus::Completed => "completed",
            InstanceStatus::Rejected => "rejected",
            InstanceStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single line of the quote draft.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LineItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl LineItem {
    pub fn total_cents(&self) -> i64 {
        self.unit_price_cents.saturating_mul(self.quantity as i64)
    }
}

/// Draft content produced by the draft node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QuoteDraft {
    pub title: String,
    pub customer: String,
    pub line_items: Vec<LineItem>,
    /// Empty or absent currency is normalized to USD by the draft node.
    #[serde(default)]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl QuoteDraft {
    pub fn total_cents(&self) -> i64 {
        self.line_items
            .iter()
            .fold(0i64, |acc, item| acc.saturating_add(item.total_cents()))
    }
}

/// The reviewer's verdict at the approval gate.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
    Edit,
}

impl Decision {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "approve" => Some(Decision::Approve),
            "reject" => Some(Decision::Reject),
            "edit" => Some(Decision::Edit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
            Decision::Edit => "edit",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision submitted by the human reviewer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApprovalDecision {
    pub decision: Decision,
    #[serde(default)]
    pub notes: String,
}

impl ApprovalDecision {
    pub fn new(decision: Decision, notes: impl Into<String>) -> Self {
        Self {
            decision,
            notes: notes.into(),
        }
    }

    pub fn validate(&self) -> Result<(), StateError> {
        if self.notes.chars().count() > MAX_DECISION_NOTES_LEN {
            return Err(StateError::NotesTooLong {
                len: self.notes.chars().count(),
                max: MAX_DECISION_NOTES_LEN,
            });
        }
        Ok(())
    }
}

/// Outcome of the finalization pipeline, recorded by the finalize node.
///
/// `delivered: false` with a recorded error is the degraded
/// completed-but-undelivered state: the artifact is durably stored but the
/// webhook notification never went through.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DeliveryRecord {
    pub artifact_url: String,
    pub expires_at: i64,
    pub idempotency_key: String,
    pub delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_error: Option<String>,
}

/// Union of all node outputs for one workflow instance.
///
/// Append-only: the terminal artifact is assembled from the union of all
/// prior outputs, so no step may erase another step's field.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ExecutionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<QuoteDraft>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<ApprovalDecision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryRecord>,
}

/// Output of one node execution, tagged by the field it owns.
#[derive(Debug, Clone)]
pub enum NodeOutput {
    Draft(QuoteDraft),
    Decision(ApprovalDecision),
    Delivery(DeliveryRecord),
    /// The node produced nothing to merge.
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Field '{0}' is already set and cannot be overwritten")]
    FieldAlreadySet(&'static str),
    #[error("Decision notes too long: {len} characters (max {max})")]
    NotesTooLong { len: usize, max: usize },
}

impl ExecutionState {
    /// Merge a node output into the state, enforcing field ownership.
    pub fn merge(&mut self, output: NodeOutput) -> Result<(), StateError> {
        match output {
            NodeOutput::Draft(draft) => {
                if self.draft.is_some() {
                    return Err(StateError::FieldAlreadySet("draft"));
                }
                self.draft = Some(draft);
            }
            NodeOutput::Decision(decision) => {
                if self.decision.is_some() {
                    return Err(StateError::FieldAlreadySet("decision"));
                }
                decision.validate()?;
                self.decision = Some(decision);
            }
            NodeOutput::Delivery(record) => {
                if self.delivery.is_some() {
                    return Err(StateError::FieldAlreadySet("delivery"));
                }
                self.delivery = Some(record);
            }
            NodeOutput::Empty => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft() -> QuoteDraft {
        QuoteDraft {
            title: "Website redesign".into(),
            customer: "Acme Corp".into(),
            line_items: vec![
                LineItem {
                    description: "Design".into(),
                    quantity: 2,
                    unit_price_cents: 50_000,
                },
                LineItem {
                    description: "Build".into(),
                    quantity: 1,
                    unit_price_cents: 120_000,
                },
            ],
            currency: "USD".into(),
            summary: None,
        }
    }

    #[test]
    fn test_total_cents() {
        assert_eq!(sample_draft().total_cents(), 220_000);
    }

    #[test]
    fn test_merge_draft_once() {
        let mut state = ExecutionState::default();
        state.merge(NodeOutput::Draft(sample_draft())).unwrap();
        let err = state.merge(NodeOutput::Draft(sample_draft())).unwrap_err();
        assert!(matches!(err, StateError::FieldAlreadySet("draft")));
    }

    #[test]
    fn test_merge_decision_once() {
        let mut state = ExecutionState::default();
        state
            .merge(NodeOutput::Decision(ApprovalDecision::new(
                Decision::Approve,
                "ok",
            )))
            .unwrap();
        let err = state
            .merge(NodeOutput::Decision(ApprovalDecision::new(
                Decision::Reject,
                "changed my mind",
            )))
            .unwrap_err();
        assert!(matches!(err, StateError::FieldAlreadySet("decision")));
        assert_eq!(state.decision.unwrap().decision, Decision::Approve);
    }

    #[test]
    fn test_merge_rejects_oversized_notes() {
        let mut state = ExecutionState::default();
        let notes = "x".repeat(MAX_DECISION_NOTES_LEN + 1);
        let err = state
            .merge(NodeOutput::Decision(ApprovalDecision::new(
                Decision::Approve,
                notes,
            )))
            .unwrap_err();
        assert!(matches!(err, StateError::NotesTooLong { .. }));
        assert!(state.decision.is_none());
    }

    #[test]
    fn test_decision_parse() {
        assert_eq!(Decision::parse("approve"), Some(Decision::Approve));
        assert_eq!(Decision::parse("reject"), Some(Decision::Reject));
        assert_eq!(Decision::parse("edit"), Some(Decision::Edit));
        assert_eq!(Decision::parse("APPROVE"), None);
        assert_eq!(Decision::parse("maybe"), None);
    }

    #[test]
    fn test_state_serde_roundtrip() {
        let mut state = ExecutionState::default();
        state.merge(NodeOutput::Draft(sample_draft())).unwrap();
        state
            .merge(NodeOutput::Decision(ApprovalDecision::new(
                Decision::Approve,
                "looks good",
            )))
            .unwrap();

        let json = serde_json::to_string(&state).unwrap();
        let back: ExecutionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(InstanceStatus::Running.to_string(), "running");
        assert_eq!(InstanceStatus::Suspended.to_string(), "suspended");
        assert_eq!(InstanceStatus::Completed.to_string(), "completed");
        assert_eq!(InstanceStatus::Rejected.to_string(), "rejected");
        assert_eq!(InstanceStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_status_is_resolved() {
        assert!(InstanceStatus::Completed.is_resolved());
        assert!(InstanceStatus::Rejected.is_resolved());
        assert!(!InstanceStatus::Running.is_resolved());
        assert!(!InstanceStatus::Suspended.is_resolved());
        assert!(!InstanceStatus::Failed.is_resolved());
    }
}
