use async_trait::async_trait;
use tracing::debug;

use crate::{
    Result,
    workflow::{
        actions::{Action, node_error, single_input},
        node::{Arity, FlowVariable, Node, NodeCategory},
        parameter::Parameter,
        registry::NodeDescriptor,
        table::{self, Artifact},
    },
};

/// Sink: writes its single input and passes it through unchanged.
pub struct WriteCsvAction;

#[async_trait]
impl Action for WriteCsvAction {
    async fn execute(
        &self,
        node: &Node,
        inputs: Vec<Artifact>,
        _flow_vars: &[FlowVariable],
    ) -> Result<Option<Artifact>> {
        let input = single_input("write csv", &inputs)?;
        let file = node.option("file")?.as_str()?;
        let sep = table::delimiter(&node.option("sep")?.as_str()?)?;
        let index = node.option("index")?.as_bool()?;

        let bytes = input.to_csv(sep, index).map_err(|e| node_error("write csv", e))?;
        tokio::fs::write(&file, bytes).await.map_err(|e| node_error("write csv", format!("{}: {}", file, e)))?;
        debug!(node_id = %node.id, file = %file, rows = input.num_rows(), "write csv");

        Ok(Some(input))
    }
}

pub fn descriptor() -> NodeDescriptor {
    NodeDescriptor::new("WriteCsvNode", "Write CSV", NodeCategory::Io, WriteCsvAction)
        .inputs(Arity::Exact(1))
        .outputs(0)
        .description("Write a table to a delimited text file")
        .option("file", Parameter::file("Filename").with_docstring("CSV file to write"))
        .option("sep", Parameter::string("Delimiter").with_default(",").with_docstring("Column delimiter"))
        .option("index", Parameter::boolean("Write Index").with_default(true).with_docstring("Write row names (index)"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        model::NodeModel,
        workflow::{NodeRegistry, table::Table},
    };

    #[tokio::test]
    async fn test_write_csv_passes_input_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let record = NodeModel::new("w", NodeCategory::Io, "WriteCsvNode").with_option("file", path.to_str().unwrap()).with_option("index", false);
        let node = NodeRegistry::builtin().create(&record).unwrap();

        let input = Arc::new(Table::from_rows(&["a", "b"], &[&["1", "2"]]).unwrap());
        let out = node.execute(vec![input.clone()], &[]).await.unwrap().unwrap();

        assert!(Arc::ptr_eq(&out, &input));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_write_csv_default_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let record = NodeModel::new("w", NodeCategory::Io, "WriteCsvNode").with_option("file", path.to_str().unwrap());
        let node = NodeRegistry::builtin().create(&record).unwrap();

        let input = Arc::new(Table::from_rows(&["a"], &[&["x"]]).unwrap());
        node.execute(vec![input], &[]).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), ",a\n0,x\n");
    }
}
