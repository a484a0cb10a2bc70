use std::sync::Arc;

use crate::{
    common::Shutdown,
    events::{GraphEvent, Message, NodeEvent, WorkflowEvent},
    runtime::{Channel, RunId},
    workflow::node::NodeId,
};

/// State shared between a run handle and the dispatcher driving the run.
#[derive(Clone)]
pub struct Context {
    run_id: RunId,
    channel: Arc<Channel>,

    /// set by the caller to stop scheduling new nodes
    cancel: Arc<Shutdown>,
    /// set by the dispatcher once the report is sent
    done: Arc<Shutdown>,
}

impl Context {
    pub fn new(
        run_id: RunId,
        channel: Arc<Channel>,
    ) -> Self {
        Self {
            run_id,
            channel,
            cancel: Arc::new(Shutdown::new()),
            done: Arc::new(Shutdown::new()),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id.to_owned()
    }

    pub fn emit_node(
        &self,
        nid: &NodeId,
        event: NodeEvent,
    ) {
        self.channel.emit(Message {
            run_id: self.run_id(),
            nid: nid.clone(),
            event: GraphEvent::Node(event),
        });
    }

    pub fn emit_workflow(
        &self,
        event: WorkflowEvent,
    ) {
        self.channel.emit(Message {
            run_id: self.run_id(),
            nid: "".to_string(),
            event: GraphEvent::Workflow(event),
        });
    }

    pub fn cancel(&self) {
        self.cancel.shutdown();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_terminated()
    }

    pub fn wait_cancelled(&self) -> impl Future<Output = ()> + Send + 'static {
        self.cancel.wait()
    }

    pub fn done(&self) {
        self.done.shutdown();
    }

    pub fn is_done(&self) -> bool {
        self.done.is_terminated()
    }
}
