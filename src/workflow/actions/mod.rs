//! Built-in node behaviours.
//!
//! Each module declares one node type (its [`NodeDescriptor`]) and the
//! [`Action`] strategy the node delegates to when it executes.

pub mod filter;
pub mod flow;
pub mod head;
pub mod join;
pub mod pivot;
pub mod read_csv;
pub mod write_csv;

use async_trait::async_trait;

use crate::{
    Result, TabflowError,
    workflow::{
        node::{FlowVariable, Node},
        registry::NodeDescriptor,
        table::Artifact,
    },
};

pub use filter::FilterAction;
pub use flow::FlowAction;
pub use head::HeadAction;
pub use join::JoinAction;
pub use pivot::PivotAction;
pub use read_csv::ReadCsvAction;
pub use write_csv::WriteCsvAction;

#[async_trait]
pub trait Action: Send + Sync {
    /// Executes the node's transform.
    ///
    /// # Arguments
    ///
    /// * `node` - The node being executed, with flow variables already substituted
    ///   and its parameters validated.
    /// * `inputs` - Artifacts of the node's direct predecessors, in edge order.
    /// * `flow_vars` - The flow variables visible to this node.
    ///
    /// # Returns
    ///
    /// Returns the produced artifact, or `None` for nodes that produce nothing.
    async fn execute(
        &self,
        node: &Node,
        inputs: Vec<Artifact>,
        flow_vars: &[FlowVariable],
    ) -> Result<Option<Artifact>>;
}

/// Descriptors of every built-in node type, in catalog order.
pub fn builtin_descriptors() -> Vec<NodeDescriptor> {
    vec![
        flow::string_descriptor(),
        flow::integer_descriptor(),
        read_csv::descriptor(),
        write_csv::descriptor(),
        pivot::descriptor(),
        join::descriptor(),
        filter::descriptor(),
        head::descriptor(),
    ]
}

/// Wrap a transform failure the way every action reports it: `<action>: <reason>`.
pub(crate) fn node_error(
    action: &str,
    err: impl std::fmt::Display,
) -> TabflowError {
    TabflowError::NodeExecution(format!("{}: {}", action, err))
}

/// The single input of a one-input transform.
pub(crate) fn single_input(
    action: &str,
    inputs: &[Artifact],
) -> Result<Artifact> {
    match inputs {
        [input] => Ok(input.clone()),
        _ => Err(node_error(action, format!("1 expected, {} provided", inputs.len()))),
    }
}
