use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    Result,
    workflow::{
        actions::{Action, node_error, single_input},
        node::{Arity, FlowVariable, Node, NodeCategory},
        parameter::Parameter,
        registry::NodeDescriptor,
        table::{Artifact, Table},
    },
};

use super::models::FilterOperator;

/// Keeps the rows whose `column` compares true against `value`.
pub struct FilterAction;

#[async_trait]
impl Action for FilterAction {
    async fn execute(
        &self,
        node: &Node,
        inputs: Vec<Artifact>,
        _flow_vars: &[FlowVariable],
    ) -> Result<Option<Artifact>> {
        let input = single_input("filter", &inputs)?;
        let column = node.option("column")?.as_str()?;
        let operator: FilterOperator = node.option("operator")?.as_str()?.parse().map_err(|e| node_error("filter", e))?;
        let value = node.option("value")?.as_str()?;

        let idx = input.column_index(&column).map_err(|e| node_error("filter", e))?;
        let mut table = Table::new(input.columns().to_vec());
        for row in input.rows().iter().filter(|r| operator.matches(&r[idx], &value)) {
            table.push_row(row.clone())?;
        }
        Ok(Some(Arc::new(table)))
    }
}

pub fn descriptor() -> NodeDescriptor {
    NodeDescriptor::new("FilterNode", "Filter", NodeCategory::Manipulation, FilterAction)
        .description("Keep the rows matching a condition")
        .option("column", Parameter::string("Column").with_docstring("Column to compare"))
        .option("operator", Parameter::choice("Operator", &FilterOperator::ALL).with_default("eq").with_docstring("Comparison to apply"))
        .option("value", Parameter::string("Value").with_docstring("Value to compare against"))
}
