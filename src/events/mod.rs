//! Event types for workflow runs.
//!
//! Events are emitted while a run progresses to notify subscribers about
//! node state changes and the final outcome of the run.

mod node;
mod workflow;

pub use node::*;
pub use workflow::*;

use crate::{runtime::RunId, workflow::node::NodeId};

/// Generic event wrapper.
#[derive(Debug, Clone)]
pub struct Event<T> {
    inner: T,
}

/// Top-level event type for run events.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    /// Run-level events (start, completed, cancelled, etc.).
    Workflow(WorkflowEvent),
    /// Node-level events (running, succeeded, failed, etc.).
    Node(NodeEvent),
}

/// Event message containing run and node context.
#[derive(Debug, Clone)]
pub struct Message {
    /// Run that generated this event.
    pub run_id: RunId,
    /// Node that generated this event (empty for workflow events).
    pub nid: NodeId,
    /// The actual event data.
    pub event: GraphEvent,
}

impl<T> std::ops::Deref for Event<T>
where
    T: std::fmt::Debug + Clone,
{
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Event<T>
where
    T: std::fmt::Debug + Clone,
{
    pub fn new(inner: &T) -> Self {
        Self {
            inner: inner.clone(),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl GraphEvent {
    /// The run reached a final state.
    pub fn is_complete(&self) -> bool {
        matches!(self, GraphEvent::Workflow(WorkflowEvent::Completed | WorkflowEvent::PartiallyFailed(_) | WorkflowEvent::Cancelled))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, GraphEvent::Node(NodeEvent::Failed(_)))
    }
}
