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

/// Keeps the first `limit` rows.
pub struct HeadAction;

#[async_trait]
impl Action for HeadAction {
    async fn execute(
        &self,
        node: &Node,
        inputs: Vec<Artifact>,
        _flow_vars: &[FlowVariable],
    ) -> Result<Option<Artifact>> {
        let input = single_input("head", &inputs)?;
        let limit = node.option("limit")?.as_i64()?;
        if limit < 0 {
            return Err(node_error("head", format!("limit must not be negative, got {}", limit)));
        }

        let mut table = Table::new(input.columns().to_vec());
        for row in input.rows().iter().take(limit as usize) {
            table.push_row(row.clone())?;
        }
        Ok(Some(Arc::new(table)))
    }
}

pub fn descriptor() -> NodeDescriptor {
    NodeDescriptor::new("HeadNode", "Head", NodeCategory::Manipulation, HeadAction)
        .description("Keep the first rows of a table")
        .option("limit", Parameter::integer("Limit").with_docstring("Number of rows to keep"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::NodeModel, workflow::NodeRegistry};

    fn input(rows: usize) -> Artifact {
        let mut table = Table::new(vec!["n".to_string()]);
        for i in 0..rows {
            table.push_row(vec![i.to_string()]).unwrap();
        }
        Arc::new(table)
    }

    #[tokio::test]
    async fn test_head_limits_rows() {
        let record = NodeModel::new("h", NodeCategory::Manipulation, "HeadNode").with_option("limit", "10");
        let node = NodeRegistry::builtin().create(&record).unwrap();

        let out = node.execute(vec![input(25)], &[]).await.unwrap().unwrap();
        assert_eq!(out.num_rows(), 10);
        assert_eq!(out.rows()[9], vec!["9"]);

        let out = node.execute(vec![input(3)], &[]).await.unwrap().unwrap();
        assert_eq!(out.num_rows(), 3);
    }

    #[tokio::test]
    async fn test_head_rejects_negative_limit() {
        let record = NodeModel::new("h", NodeCategory::Manipulation, "HeadNode").with_option("limit", -1);
        let node = NodeRegistry::builtin().create(&record).unwrap();
        assert!(node.execute(vec![input(3)], &[]).await.is_err());
    }
}
