pub mod actions;
pub mod edge;
pub mod node;
pub mod parameter;
pub mod registry;
pub mod table;
pub mod template;
mod workflow;

pub use actions::Action;
pub use node::{Arity, FlowVariable, Node, NodeCategory, NodeId, NodeResult, NodeState};
pub use parameter::{Parameter, ParameterType};
pub use registry::{Catalog, NodeDescriptor, NodeRegistry, NodeTypeInfo};
pub use table::{Artifact, Header, Table};
pub use workflow::Workflow;
