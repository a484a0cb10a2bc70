//! Serialized (node-link) form of a workflow.
//!
//! These types are what crosses the boundary: files on disk, session
//! storage and the network all carry a [`WorkflowModel`].

mod edge;
mod node;
mod workflow;

pub use edge::EdgeModel;
pub use node::NodeModel;
pub use workflow::{WorkflowModel, WorkflowSession};
