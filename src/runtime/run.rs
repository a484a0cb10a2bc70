use std::{sync::Arc, time::Duration};

use serde_json::Value;

use crate::{
    ExecutionMode, Result, TabflowError,
    common::{Queue, Vars},
    runtime::{Context, RunReport},
};

pub type RunId = String;

/// Per-run settings on top of the engine configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// values replacing the declared default of flow variables, by variable name
    pub flow_overrides: Vars,
    /// overrides the engine's per-node timeout
    pub node_timeout: Option<Duration>,
    /// overrides the engine's execution mode
    pub mode: Option<ExecutionMode>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flow_override<T: Into<Value>>(
        mut self,
        name: &str,
        value: T,
    ) -> Self {
        self.flow_overrides.set(name, value);
        self
    }

    pub fn with_node_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.node_timeout = Some(timeout);
        self
    }

    pub fn with_mode(
        mut self,
        mode: ExecutionMode,
    ) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Caller side of a started run.
pub struct RunHandle {
    ctx: Arc<Context>,
    report_queue: Arc<Queue<RunReport>>,
}

impl RunHandle {
    pub(crate) fn new(
        ctx: Arc<Context>,
        report_queue: Arc<Queue<RunReport>>,
    ) -> Self {
        Self {
            ctx,
            report_queue,
        }
    }

    pub fn id(&self) -> RunId {
        self.ctx.run_id()
    }

    /// Stop starting nodes; running ones finish, the rest are skipped.
    pub fn cancel(&self) {
        self.ctx.cancel();
    }

    pub fn is_complete(&self) -> bool {
        self.ctx.is_done()
    }

    /// The report, if the run already delivered it.
    pub fn try_report(&self) -> Option<RunReport> {
        self.report_queue.try_next()
    }

    /// Block the current thread until the run report is available.
    ///
    /// Must not be called from inside an async task; use [`RunHandle::wait_async`] there.
    pub fn wait(self) -> Result<RunReport> {
        self.report_queue.next().map_err(|e| TabflowError::Engine(format!("run {} ended without a report: {}", self.ctx.run_id(), e)))
    }

    pub async fn wait_async(self) -> Result<RunReport> {
        self.report_queue.next_async().await.map_err(|e| TabflowError::Engine(format!("run {} ended without a report: {}", self.ctx.run_id(), e)))
    }
}
