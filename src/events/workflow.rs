use crate::workflow::node::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    Start(WorkflowStartEvent),
    Completed,
    PartiallyFailed(WorkflowFailedEvent),
    Cancelled,
}

impl WorkflowEvent {
    pub fn str(&self) -> &str {
        match self {
            WorkflowEvent::Start(_) => "Running",
            WorkflowEvent::Completed => "Completed",
            WorkflowEvent::PartiallyFailed(_) => "PartiallyFailed",
            WorkflowEvent::Cancelled => "Cancelled",
        }
    }
}

/// Event emitted when a run starts
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowStartEvent {
    /// All node IDs in execution order
    pub node_ids: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowFailedEvent {
    /// nodes whose own execution failed
    pub failed: Vec<NodeId>,
}
