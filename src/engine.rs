//! Workflow engine - the main entry point for Tabflow.
//!
//! The engine owns the pieces every run shares:
//! - The tokio runtime node tasks execute on
//! - The node registry runs materialize their nodes from
//! - The event channel run events are broadcast through

use std::{sync::Arc, time::Duration};

use tokio::runtime::Runtime;
use tracing::info;

use crate::{
    Config, EngineBuilder, ExecutionMode, Result,
    common::Queue,
    dispatcher::{DispatchOptions, Dispatcher, ExecutionPlan},
    runtime::{Channel, Context, RunHandle, RunOptions, RunReport},
    utils,
    workflow::{Catalog, NodeRegistry, Workflow},
};

/// The main workflow engine.
///
/// # Example
///
/// ```rust,ignore
/// let engine = EngineBuilder::new().build()?;
///
/// let workflow = Workflow::from_json(json_str)?;
/// let report = engine.run(&workflow, RunOptions::default())?;
/// println!("{}", report.status.as_ref());
/// ```
pub struct Engine {
    /// Node types runs can materialize.
    registry: Arc<NodeRegistry>,
    /// Event channel for broadcasting run events.
    channel: Arc<Channel>,
    /// Tokio runtime for async task execution.
    runtime: Arc<Runtime>,
    mode: ExecutionMode,
    node_timeout: Option<Duration>,
}

impl Engine {
    pub(crate) fn new(
        runtime: Arc<Runtime>,
        registry: Arc<NodeRegistry>,
        mode: ExecutionMode,
        node_timeout: Option<Duration>,
    ) -> Self {
        let channel = Arc::new(Channel::new());
        channel.listen(&runtime);

        Self {
            registry,
            channel,
            runtime,
            mode,
            node_timeout,
        }
    }

    /// Creates an engine with the built-in node types and the given configuration.
    pub fn new_with_config(config: Config) -> Result<Self> {
        EngineBuilder::from_config(&config).build()
    }

    pub fn registry(&self) -> Arc<NodeRegistry> {
        self.registry.clone()
    }

    /// Returns a reference to the event channel.
    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }

    /// Catalog of every node type this engine can run.
    pub fn list_types(&self) -> Catalog {
        self.registry.list_types()
    }

    /// Snapshot `workflow` and start running it.
    ///
    /// A cycle or an unknown node type is returned here, before any node runs.
    /// Everything that goes wrong afterwards is recorded in the node results.
    pub fn start(
        &self,
        workflow: &Workflow,
        options: RunOptions,
    ) -> Result<RunHandle> {
        let plan = Arc::new(ExecutionPlan::build(workflow, &self.registry)?);

        let run_id = utils::longid();
        let ctx = Arc::new(Context::new(run_id.clone(), self.channel.clone()));
        let report_queue = Queue::new(1);

        let options = DispatchOptions {
            mode: options.mode.unwrap_or(self.mode),
            node_timeout: options.node_timeout.or(self.node_timeout),
            flow_overrides: options.flow_overrides,
        };
        info!(run_id = %run_id, nodes = plan.len(), "start run");

        Dispatcher::new(ctx.clone(), plan, options, report_queue.clone()).start(&self.runtime);

        Ok(RunHandle::new(ctx, report_queue))
    }

    /// Run `workflow` to completion, blocking the current thread.
    pub fn run(
        &self,
        workflow: &Workflow,
        options: RunOptions,
    ) -> Result<RunReport> {
        self.start(workflow, options)?.wait()
    }

    pub async fn run_async(
        &self,
        workflow: &Workflow,
        options: RunOptions,
    ) -> Result<RunReport> {
        self.start(workflow, options)?.wait_async().await
    }

    /// Stop delivering events to channel handlers.
    pub fn shutdown(&self) {
        self.channel.shutdown();
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.channel.shutdown();
    }
}
