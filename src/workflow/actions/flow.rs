//! Flow nodes publish one named variable for their downstream nodes.

use async_trait::async_trait;

use crate::{
    Result,
    workflow::{
        actions::Action,
        node::{Arity, FLOW_DEFAULT_VALUE, FLOW_VAR_NAME, FlowVariable, Node, NodeCategory},
        parameter::Parameter,
        registry::NodeDescriptor,
        table::Artifact,
    },
};

/// Executing a flow node produces nothing; the engine reads
/// [`Node::flow_variable`] once the node has succeeded.
pub struct FlowAction;

#[async_trait]
impl Action for FlowAction {
    async fn execute(
        &self,
        _node: &Node,
        _inputs: Vec<Artifact>,
        _flow_vars: &[FlowVariable],
    ) -> Result<Option<Artifact>> {
        Ok(None)
    }
}

fn var_name() -> Parameter {
    Parameter::string("Variable Name").with_default("my_var").with_docstring("Name of the variable to use in another Node")
}

pub fn string_descriptor() -> NodeDescriptor {
    NodeDescriptor::new("StringNode", "String Input", NodeCategory::Flow, FlowAction)
        .inputs(Arity::UpTo(1))
        .description("Publish a string value as a flow variable")
        .option(FLOW_DEFAULT_VALUE, Parameter::string("Default Value").with_docstring("Value this node will pass as a flow variable"))
        .option(FLOW_VAR_NAME, var_name())
}

pub fn integer_descriptor() -> NodeDescriptor {
    NodeDescriptor::new("IntegerNode", "Integer Input", NodeCategory::Flow, FlowAction)
        .inputs(Arity::UpTo(1))
        .description("Publish an integer value as a flow variable")
        .option(FLOW_DEFAULT_VALUE, Parameter::integer("Default Value").with_docstring("Value this node will pass as a flow variable"))
        .option(FLOW_VAR_NAME, var_name())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{model::NodeModel, workflow::NodeRegistry};

    #[tokio::test]
    async fn test_flow_node_produces_no_artifact() {
        let record = NodeModel::new("v", NodeCategory::Flow, "StringNode").with_option("default_value", "emea").with_option("var_name", "region");
        let node = NodeRegistry::builtin().create(&record).unwrap();

        let out = node.execute(vec![], &[]).await.unwrap();
        assert!(out.is_none());
        assert_eq!(node.flow_variable().unwrap(), FlowVariable::new("region", "emea"));
    }

    #[test]
    fn test_integer_node_requires_integer_value() {
        let registry = NodeRegistry::builtin();
        let mut node = registry.create(&NodeModel::new("n", NodeCategory::Flow, "IntegerNode")).unwrap();
        assert!(node.validate().is_err());

        node.set_option("default_value", "ten");
        assert!(node.validate().is_err());

        node.set_option("default_value", 10);
        assert!(node.validate().is_ok());
        assert_eq!(node.flow_variable().unwrap().value, json!(10));
        assert_eq!(node.flow_variable().unwrap().name, "my_var");
    }
}
