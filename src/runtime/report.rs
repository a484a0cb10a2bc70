use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    runtime::RunId,
    workflow::{
        node::{FlowVariable, NodeId, NodeResult, NodeState},
        table::Artifact,
    },
};

/// Overall outcome of a run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    /// every node succeeded
    Completed,
    /// at least one node failed; independent branches still ran
    PartiallyFailed,
    /// cancelled before every node had started
    Cancelled,
}

/// Per-node results of one run.
#[derive(Serialize, Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub status: RunStatus,
    /// topological order the run followed
    pub order: Vec<NodeId>,
    pub results: BTreeMap<NodeId, NodeResult>,
    /// every variable published during the run, in publication order
    pub flow_vars: Vec<FlowVariable>,
    pub started_at: i64,
    pub ended_at: i64,
}

impl RunReport {
    pub fn result(
        &self,
        nid: &str,
    ) -> Option<&NodeResult> {
        self.results.get(nid)
    }

    pub fn state(
        &self,
        nid: &str,
    ) -> Option<NodeState> {
        self.results.get(nid).map(|r| r.state)
    }

    pub fn artifact(
        &self,
        nid: &str,
    ) -> Option<&Artifact> {
        self.results.get(nid).and_then(|r| r.artifact.as_ref())
    }

    /// Node ids in `state`, in run order.
    pub fn nodes_in(
        &self,
        state: NodeState,
    ) -> Vec<&NodeId> {
        self.order.iter().filter(|nid| self.state(nid) == Some(state)).collect()
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }
}
