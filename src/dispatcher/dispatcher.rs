//! Run dispatcher for scheduling and executing nodes.
//!
//! The dispatcher is responsible for:
//! - Releasing nodes once every direct predecessor is terminal
//! - Propagating skips below failed or skipped nodes
//! - Publishing flow variables to the nodes that descend from them
//! - Stopping the schedule on cancellation and reporting the outcome

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
    time::Duration,
};

use tokio::{runtime::Runtime, sync::mpsc};
use tracing::{debug, info, warn};

use crate::{
    ExecutionMode, Result, TabflowError,
    common::{Queue, Vars},
    dispatcher::ExecutionPlan,
    events::{NodeEvent, WorkflowEvent, WorkflowFailedEvent, WorkflowStartEvent},
    runtime::{Context, RunReport, RunStatus},
    utils,
    workflow::{
        node::{FLOW_DEFAULT_VALUE, FLOW_VAR_NAME, FlowVariable, Node, NodeResult, NodeState},
        table::Artifact,
    },
};

const COMPLETION_QUEUE_SIZE: usize = 1024;

/// Knobs resolved from the engine config and the run options.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub mode: ExecutionMode,
    pub node_timeout: Option<Duration>,
    pub flow_overrides: Vars,
}

/// What a finished node task hands back to the loop.
struct Completion {
    pos: usize,
    outcome: Result<NodeOutput>,
    started_at: i64,
    ended_at: i64,
}

#[derive(Default)]
struct NodeOutput {
    artifact: Option<Artifact>,
    flow_var: Option<FlowVariable>,
}

/// Mutable bookkeeping of one run, owned by the dispatcher loop.
struct RunState {
    states: Vec<NodeState>,
    results: BTreeMap<usize, NodeResult>,
    artifacts: HashMap<usize, Artifact>,
    published: HashMap<usize, FlowVariable>,
    /// predecessors not yet terminal
    waiting_on: Vec<usize>,
    /// ready positions; the lowest topological position starts first
    ready: BTreeSet<usize>,
    running: usize,
    cancelled_skips: usize,
}

impl RunState {
    fn new(plan: &ExecutionPlan) -> Self {
        Self {
            states: vec![NodeState::Pending; plan.len()],
            results: BTreeMap::new(),
            artifacts: HashMap::new(),
            published: HashMap::new(),
            waiting_on: (0..plan.len()).map(|pos| plan.preds(pos).len()).collect(),
            ready: BTreeSet::new(),
            running: 0,
            cancelled_skips: 0,
        }
    }
}

/// Drives one run of an [`ExecutionPlan`].
///
/// A single loop owns all run state; node tasks only see their own inputs
/// and report back over an mpsc channel.
pub struct Dispatcher {
    ctx: Arc<Context>,
    plan: Arc<ExecutionPlan>,
    options: DispatchOptions,
    report_queue: Arc<Queue<RunReport>>,
}

impl Dispatcher {
    pub fn new(
        ctx: Arc<Context>,
        plan: Arc<ExecutionPlan>,
        options: DispatchOptions,
        report_queue: Arc<Queue<RunReport>>,
    ) -> Self {
        Self {
            ctx,
            plan,
            options,
            report_queue,
        }
    }

    /// Spawn the dispatcher loop; the report is sent to the report queue.
    pub fn start(
        self,
        runtime: &Runtime,
    ) {
        runtime.spawn(async move {
            let report = self.run().await;
            if let Err(e) = self.report_queue.send_async(report).await {
                warn!(run_id = %self.ctx.run_id(), error = %e, "run report dropped");
            }
            self.ctx.done();
        });
    }

    async fn run(&self) -> RunReport {
        let started_at = utils::time::time_millis();
        let (tx, mut rx) = mpsc::channel::<Completion>(COMPLETION_QUEUE_SIZE);
        let mut state = RunState::new(&self.plan);
        let mut cancel_seen = false;

        info!(run_id = %self.ctx.run_id(), nodes = self.plan.len(), mode = ?self.options.mode, "run started");
        self.ctx.emit_workflow(WorkflowEvent::Start(WorkflowStartEvent {
            node_ids: self.plan.order().to_vec(),
        }));

        for pos in 0..self.plan.len() {
            if state.waiting_on[pos] == 0 {
                self.mark_ready(&mut state, pos);
            }
        }

        loop {
            if self.ctx.is_cancelled() {
                self.skip_unstarted(&mut state);
            } else {
                self.schedule(&mut state, &tx);
            }

            if state.running == 0 && state.ready.is_empty() {
                break;
            }

            tokio::select! {
                Some(completion) = rx.recv() => {
                    self.complete(&mut state, completion);
                }
                _ = self.ctx.wait_cancelled(), if !cancel_seen => {
                    cancel_seen = true;
                    info!(run_id = %self.ctx.run_id(), running = state.running, "run cancelled");
                }
                else => break,
            }
        }

        self.report(state, started_at)
    }

    fn mark_ready(
        &self,
        state: &mut RunState,
        pos: usize,
    ) {
        state.states[pos] = NodeState::Ready;
        state.ready.insert(pos);
        self.ctx.emit_node(self.plan.node_id(pos), NodeEvent::Ready);
    }

    /// Start ready nodes: all of them in parallel mode, one at a time otherwise.
    fn schedule(
        &self,
        state: &mut RunState,
        tx: &mpsc::Sender<Completion>,
    ) {
        loop {
            if self.options.mode == ExecutionMode::Sequential && state.running > 0 {
                return;
            }
            let Some(pos) = state.ready.pop_first() else {
                return;
            };

            // a failed or skipped predecessor skips the node without running it
            let blocked = self.plan.preds(pos).iter().find(|p| matches!(state.states[**p], NodeState::Failed | NodeState::Skipped)).copied();
            if let Some(pred) = blocked {
                let reason = match state.states[pred] {
                    NodeState::Failed => format!("predecessor {} failed", self.plan.node_id(pred)),
                    _ => format!("predecessor {} was skipped", self.plan.node_id(pred)),
                };
                self.skip(state, pos, reason);
                self.release_successors(state, pos);
                continue;
            }

            self.spawn_node(state, pos, tx);
        }
    }

    fn spawn_node(
        &self,
        state: &mut RunState,
        pos: usize,
        tx: &mpsc::Sender<Completion>,
    ) {
        let node = self.plan.node(pos).clone();
        // flow predecessors produce no artifact and add no input
        let inputs: Vec<Artifact> = self.plan.preds(pos).iter().filter_map(|p| state.artifacts.get(p).cloned()).collect();
        let flow_vars = self.plan.visible_flow_vars(pos, &state.published);
        let overrides = self.options.flow_overrides.clone();
        let timeout = self.options.node_timeout;
        let tx = tx.clone();

        let started_at = utils::time::time_millis();
        state.states[pos] = NodeState::Running;
        state.running += 1;
        debug!(run_id = %self.ctx.run_id(), node_id = %node.id, inputs = inputs.len(), flow_vars = flow_vars.len(), "node started");
        self.ctx.emit_node(&node.id, NodeEvent::Running(started_at));

        tokio::spawn(async move {
            // a panicking action still reports back, as a failure
            let task = tokio::spawn(execute_node(node, inputs, flow_vars, overrides, timeout));
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(TabflowError::NodeExecution(format!("node task aborted: {}", e))),
            };
            let _ = tx
                .send(Completion {
                    pos,
                    outcome,
                    started_at,
                    ended_at: utils::time::time_millis(),
                })
                .await;
        });
    }

    fn complete(
        &self,
        state: &mut RunState,
        completion: Completion,
    ) {
        let Completion {
            pos,
            outcome,
            started_at,
            ended_at,
        } = completion;
        let nid = self.plan.node_id(pos);
        state.running -= 1;

        match outcome {
            Ok(output) => {
                debug!(run_id = %self.ctx.run_id(), node_id = %nid, elapsed_ms = ended_at - started_at, "node succeeded");
                if let Some(artifact) = &output.artifact {
                    state.artifacts.insert(pos, artifact.clone());
                }
                if let Some(var) = output.flow_var {
                    debug!(node_id = %nid, name = %var.name, "flow variable published");
                    state.published.insert(pos, var);
                }
                state.states[pos] = NodeState::Succeeded;
                state.results.insert(pos, NodeResult::succeeded(output.artifact, started_at, ended_at));
                self.ctx.emit_node(nid, NodeEvent::Succeeded(ended_at));
            }
            Err(err) => {
                warn!(run_id = %self.ctx.run_id(), node_id = %nid, error = %err, "node failed");
                state.states[pos] = NodeState::Failed;
                self.ctx.emit_node(nid, NodeEvent::Failed(err.to_string()));
                state.results.insert(pos, NodeResult::failed(err, started_at, ended_at));
            }
        }

        if !self.ctx.is_cancelled() {
            self.release_successors(state, pos);
        }
    }

    /// A node became terminal: successors with no pending predecessor become ready.
    fn release_successors(
        &self,
        state: &mut RunState,
        pos: usize,
    ) {
        for succ in self.plan.succs(pos) {
            state.waiting_on[*succ] -= 1;
            if state.waiting_on[*succ] == 0 && state.states[*succ] == NodeState::Pending {
                self.mark_ready(state, *succ);
            }
        }
    }

    fn skip(
        &self,
        state: &mut RunState,
        pos: usize,
        reason: String,
    ) {
        debug!(run_id = %self.ctx.run_id(), node_id = %self.plan.node_id(pos), reason = %reason, "node skipped");
        state.states[pos] = NodeState::Skipped;
        self.ctx.emit_node(self.plan.node_id(pos), NodeEvent::Skipped(reason.clone()));
        state.results.insert(pos, NodeResult::skipped(reason));
    }

    /// After cancellation nothing new starts; every node not yet started is skipped.
    fn skip_unstarted(
        &self,
        state: &mut RunState,
    ) {
        state.ready.clear();
        for pos in 0..self.plan.len() {
            if matches!(state.states[pos], NodeState::Pending | NodeState::Ready) {
                self.skip(state, pos, "run cancelled".to_string());
                state.cancelled_skips += 1;
            }
        }
    }

    fn report(
        &self,
        state: RunState,
        started_at: i64,
    ) -> RunReport {
        let failed: Vec<String> = (0..self.plan.len()).filter(|pos| state.states[*pos] == NodeState::Failed).map(|pos| self.plan.node_id(pos).clone()).collect();

        let status = if state.cancelled_skips > 0 {
            RunStatus::Cancelled
        } else if !failed.is_empty() {
            RunStatus::PartiallyFailed
        } else {
            RunStatus::Completed
        };

        let event = match status {
            RunStatus::Completed => WorkflowEvent::Completed,
            RunStatus::PartiallyFailed => WorkflowEvent::PartiallyFailed(WorkflowFailedEvent {
                failed,
            }),
            RunStatus::Cancelled => WorkflowEvent::Cancelled,
        };

        let flow_vars = (0..self.plan.len()).filter_map(|pos| state.published.get(&pos).cloned()).collect();
        let results = state.results.into_iter().map(|(pos, result)| (self.plan.node_id(pos).clone(), result)).collect();

        info!(run_id = %self.ctx.run_id(), status = status.as_ref(), "run finished");
        self.ctx.emit_workflow(event);

        RunReport {
            run_id: self.ctx.run_id(),
            status,
            order: self.plan.order().to_vec(),
            results,
            flow_vars,
            started_at,
            ended_at: utils::time::time_millis(),
        }
    }
}

/// Runs on its own task: substitute, validate, check arity, execute.
async fn execute_node(
    mut node: Node,
    inputs: Vec<Artifact>,
    flow_vars: Vec<FlowVariable>,
    overrides: Vars,
    timeout: Option<Duration>,
) -> Result<NodeOutput> {
    node.apply_flow_vars(&flow_vars)?;

    if node.is_flow() {
        let name = node.option(FLOW_VAR_NAME)?.as_str()?;
        if let Some(value) = overrides.get_value(&name) {
            node.set_option(FLOW_DEFAULT_VALUE, value.clone());
        }
    }

    node.validate()?;
    node.check_arity(inputs.len())?;

    let artifact = match timeout {
        Some(d) => tokio::time::timeout(d, node.execute(inputs, &flow_vars))
            .await
            .map_err(|_| TabflowError::NodeExecution(format!("{} timed out after {}ms", node.type_key(), d.as_millis())))??,
        None => node.execute(inputs, &flow_vars).await?,
    };

    let flow_var = if node.is_flow() { Some(node.flow_variable()?) } else { None };

    Ok(NodeOutput {
        artifact,
        flow_var,
    })
}
