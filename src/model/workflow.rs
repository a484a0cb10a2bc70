use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    Result, TabflowError,
    model::{EdgeModel, NodeModel},
};

/// Node-link document: `{ "nodes": [...], "edges": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowModel {
    #[serde(default)]
    pub nodes: Vec<NodeModel>,
    #[serde(default)]
    pub edges: Vec<EdgeModel>,
    /// graph-level attributes this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowModel {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str::<WorkflowModel>(s).map_err(|e| TabflowError::Graph(format!("invalid workflow document: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// What a session layer stores between requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSession {
    #[serde(default)]
    pub graph: Option<WorkflowModel>,
    #[serde(default)]
    pub file_path: Option<String>,
}
