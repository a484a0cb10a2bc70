use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    Result,
    workflow::{
        actions::{Action, node_error},
        node::{Arity, FlowVariable, Node, NodeCategory},
        parameter::Parameter,
        registry::NodeDescriptor,
        table::{self, Artifact, Header, Table},
    },
};

pub struct ReadCsvAction;

#[async_trait]
impl Action for ReadCsvAction {
    async fn execute(
        &self,
        node: &Node,
        _inputs: Vec<Artifact>,
        _flow_vars: &[FlowVariable],
    ) -> Result<Option<Artifact>> {
        let file = node.option("file")?.as_str()?;
        let sep = table::delimiter(&node.option("sep")?.as_str()?)?;
        let header: Header = node.option("header")?.as_str()?.parse()?;

        let bytes = tokio::fs::read(&file).await.map_err(|e| node_error("read csv", format!("{}: {}", file, e)))?;
        let table = Table::from_csv(bytes.as_slice(), sep, header).map_err(|e| node_error("read csv", e))?;
        debug!(node_id = %node.id, file = %file, rows = table.num_rows(), "read csv");

        Ok(Some(Arc::new(table)))
    }
}

pub fn descriptor() -> NodeDescriptor {
    NodeDescriptor::new("ReadCsvNode", "Read CSV", NodeCategory::Io, ReadCsvAction)
        .inputs(Arity::UpTo(0))
        .description("Read a delimited text file into a table")
        .option("file", Parameter::file("File").with_docstring("CSV File"))
        .option("sep", Parameter::string("Delimiter").with_default(",").with_docstring("Column delimiter"))
        .option("header", Parameter::string("Header Row").with_default("infer").with_docstring("Row number containing column names (0-indexed), 'infer' or 'none'"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::{TabflowError, model::NodeModel, workflow::NodeRegistry};

    #[tokio::test]
    async fn test_read_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "id;name\n1;ann\n2;bob\n").unwrap();

        let record = NodeModel::new("r", NodeCategory::Io, "ReadCsvNode").with_option("file", file.path().to_str().unwrap()).with_option("sep", ";");
        let node = NodeRegistry::builtin().create(&record).unwrap();

        let table = node.execute(vec![], &[]).await.unwrap().unwrap();
        assert_eq!(table.columns(), &["id", "name"]);
        assert_eq!(table.column("name").unwrap(), vec!["ann", "bob"]);
    }

    #[tokio::test]
    async fn test_read_csv_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        let record = NodeModel::new("r", NodeCategory::Io, "ReadCsvNode").with_option("file", path.to_str().unwrap());
        let node = NodeRegistry::builtin().create(&record).unwrap();

        let err = node.execute(vec![], &[]).await.unwrap_err();
        assert!(matches!(err, TabflowError::NodeExecution(_)));
        assert!(err.to_string().contains("read csv"));
    }
}
