//! The execution graph: named nodes and the routing function.
//!
//! The graph for this workflow shape is deliberately small: a draft step, one
//! approval gate, a finalize step, and a terminal non-finalize path. Routing
//! is a pure function of the accumulated [`ExecutionState`], so re-entering
//! the loop after a restart never re-runs a node whose output is already
//! present. The graph is constructed explicitly and injected into the runner;
//! there is no process-wide singleton.

use crate::core::state::{Decision, ExecutionState};

pub const NODE_DRAFT: &str = "draft";
pub const NODE_APPROVAL_GATE: &str = "approval_gate";
pub const NODE_FINALIZE: &str = "finalize";
pub const NODE_TERMINAL: &str = "terminal";

/// What the router wants the runner to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Execute the named node.
    Execute(&'static str),
    /// Stop at the approval gate and wait for an external decision.
    Suspend,
    /// Terminal non-finalize path (rejected or edit-requested).
    Terminal,
    /// Delivery is recorded; the instance is done.
    Complete,
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Unknown node: {0}")]
    UnknownNode(String),
    #[error("Graph has no gate node")]
    NoGateNode,
}

/// Declarative node set with one designated gate.
#[derive(Debug, Clone)]
pub struct ExecutionGraph {
    nodes: Vec<&'static str>,
    gate: &'static str,
}

impl ExecutionGraph {
    /// The draft -> gate -> finalize/terminal graph this engine ships with.
    pub fn standard() -> Self {
        Self {
            nodes: vec![NODE_DRAFT, NODE_APPROVAL_GATE, NODE_FINALIZE, NODE_TERMINAL],
            gate: NODE_APPROVAL_GATE,
        }
    }

    pub fn gate_node(&self) -> &'static str {
        self.gate
    }

    pub fn contains(&self, node: &str) -> bool {
        self.nodes.iter().any(|n| *n == node)
    }

    /// Pick the next step given everything produced so far.
    ///
    /// The decision routes `approve` to finalize; `reject` and `edit` both
    /// take the terminal path (`edit` is accepted as data but currently
    /// treated the same as a rejection). An absent decision suspends at the
    /// gate.
    pub fn route(&self, state: &ExecutionState) -> RouteOutcome {
        if state.delivery.is_some() {
            return RouteOutcome::Complete;
        }
        if state.draft.is_none() {
            return RouteOutcome::Execute(NODE_DRAFT);
        }
        match state.decision.as_ref().map(|d| d.decision) {
            None => RouteOutcome::Suspend,
            Some(Decision::Approve) => RouteOutcome::Execute(NODE_FINALIZE),
            Some(Decision::Reject) | Some(Decision::Edit) => RouteOutcome::Terminal,
        }
    }
}
