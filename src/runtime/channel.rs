use std::sync::{Arc, RwLock};

use tokio::{runtime::Runtime, sync::broadcast::error::RecvError};
use tracing::warn;

use crate::{
    Result, ShareLock,
    common::{BroadcastQueue, Shutdown},
    events::{Event, GraphEvent, Message, NodeEvent},
    runtime::RunId,
    workflow::node::NodeId,
};

macro_rules! dispatch_event {
    ($handles:expr, $(&$item:ident), +) => {
        if let Ok(handlers) = $handles.read() {
            for handle in handlers.iter() {
                (handle)($(&$item),+);
            }
        }
    };
}

const EVENT_QUEUE_SIZE: usize = 2048;

pub type WorkflowEventHandle = Arc<dyn Fn(&Event<Message>) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// use the glob pattern to match the run id
    /// eg. run1*
    pub run_id: String,

    /// use the glob pattern to match the node id
    /// eg. read*
    pub nid: String,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            run_id: "*".to_string(),
            nid: "*".to_string(),
        }
    }
}

impl ChannelOptions {
    pub fn new(
        run_id: String,
        nid: String,
    ) -> Self {
        Self {
            run_id,
            nid,
        }
    }

    pub fn with_run_id(run_id: String) -> Self {
        Self {
            run_id,
            nid: "*".to_string(),
        }
    }

    pub fn with_nid(nid: String) -> Self {
        Self {
            run_id: "*".to_string(),
            nid,
        }
    }
}

/// Fan-out point for run events.
///
/// Dispatchers publish into a broadcast queue; one listener task drains it
/// and calls every registered handler in registration order.
pub struct Channel {
    event_queue: Arc<BroadcastQueue<Event<Message>>>,
    events: ShareLock<Vec<WorkflowEventHandle>>,
    shutdown: Arc<Shutdown>,
}

impl Channel {
    pub(crate) fn new() -> Self {
        Self {
            event_queue: BroadcastQueue::new(EVENT_QUEUE_SIZE),
            events: Arc::new(RwLock::new(Vec::new())),
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    /// Publish an event; with no listener subscribed it is dropped.
    pub(crate) fn emit(
        &self,
        message: Message,
    ) {
        let _ = self.event_queue.send(Event::new(&message));
    }

    pub(crate) fn listen(
        &self,
        runtime: &Runtime,
    ) {
        let mut event_queue = self.event_queue.subscribe();
        let events = self.events.clone();

        let shutdown = self.shutdown.clone();
        runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    received = event_queue.recv() => match received {
                        Ok(e) => {
                            dispatch_event!(events, &e);
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "event listener lagged, events dropped");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        });
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.shutdown();
    }
}

/// Handler registration filtered by run id and node id globs.
#[derive(Clone)]
pub struct ChannelEvent {
    channel: Arc<Channel>,

    glob: (globset::GlobMatcher, globset::GlobMatcher),
}

impl ChannelEvent {
    pub fn channel(
        channel: Arc<Channel>,
        options: ChannelOptions,
    ) -> Result<Self> {
        Ok(Self {
            channel,
            glob: (globset::Glob::new(&options.run_id)?.compile_matcher(), globset::Glob::new(&options.nid)?.compile_matcher()),
        })
    }

    fn push(
        &self,
        handle: WorkflowEventHandle,
    ) {
        if let Ok(mut handlers) = self.channel.events.write() {
            handlers.push(handle);
        }
    }

    /// Called with the run id once a matching run reaches its final state.
    pub fn on_complete(
        &self,
        f: impl Fn(RunId) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.push(Arc::new(move |e| {
            if e.event.is_complete() && is_match(&glob, e) {
                f(e.run_id.clone());
            }
        }));
    }

    /// Called for every node failure.
    pub fn on_error(
        &self,
        f: impl Fn(&Event<Message>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.push(Arc::new(move |e| {
            if e.event.is_error() && is_match(&glob, e) {
                f(e);
            }
        }));
    }

    /// Called for node state changes only.
    pub fn on_node(
        &self,
        f: impl Fn(&NodeId, &NodeEvent) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.push(Arc::new(move |e| {
            if let GraphEvent::Node(event) = &e.event {
                if is_match(&glob, e) {
                    f(&e.nid, event);
                }
            }
        }));
    }

    pub fn on_event(
        &self,
        f: impl Fn(&Event<Message>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.push(Arc::new(move |e| {
            if is_match(&glob, e) {
                f(e);
            }
        }));
    }
}

fn is_match(
    glob: &(globset::GlobMatcher, globset::GlobMatcher),
    e: &Event<Message>,
) -> bool {
    let (pat_run_id, pat_nid) = glob;
    pat_run_id.is_match(&e.run_id) && pat_nid.is_match(&e.nid)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::events::WorkflowEvent;

    fn message(
        run_id: &str,
        nid: &str,
        event: GraphEvent,
    ) -> Message {
        Message {
            run_id: run_id.to_string(),
            nid: nid.to_string(),
            event,
        }
    }

    #[test]
    fn test_handlers_filter_by_glob() {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let channel = Arc::new(Channel::new());
        channel.listen(&runtime);

        let (tx, rx) = flume::unbounded();
        let on_node = tx.clone();
        ChannelEvent::channel(channel.clone(), ChannelOptions::with_nid("read*".to_string()))
            .unwrap()
            .on_node(move |nid, event| {
                let _ = on_node.send(format!("{}:{}", nid, event.str()));
            });
        ChannelEvent::channel(channel.clone(), ChannelOptions::with_run_id("run-1".to_string()))
            .unwrap()
            .on_complete(move |run_id| {
                let _ = tx.send(format!("done:{}", run_id));
            });

        runtime.block_on(async {
            channel.emit(message("run-1", "read_a", GraphEvent::Node(NodeEvent::Running(1))));
            channel.emit(message("run-1", "head", GraphEvent::Node(NodeEvent::Running(2))));
            channel.emit(message("run-2", "", GraphEvent::Workflow(WorkflowEvent::Completed)));
            channel.emit(message("run-1", "", GraphEvent::Workflow(WorkflowEvent::Cancelled)));
            tokio::time::sleep(Duration::from_millis(50)).await;
        });

        let received: Vec<String> = rx.try_iter().collect();
        assert_eq!(received, vec!["read_a:Running", "done:run-1"]);
        channel.shutdown();
    }

    #[test]
    fn test_invalid_glob() {
        let channel = Arc::new(Channel::new());
        assert!(ChannelEvent::channel(channel, ChannelOptions::with_nid("[".to_string())).is_err());
    }
}
