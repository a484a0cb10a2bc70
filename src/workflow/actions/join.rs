use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::{
    Result,
    workflow::{
        actions::{Action, node_error},
        node::{Arity, FlowVariable, Node, NodeCategory},
        parameter::Parameter,
        registry::NodeDescriptor,
        table::{Artifact, Table},
    },
};

/// Joins the first input (left) with the second (right) on a shared column.
///
/// Right-hand columns other than `on` are appended; a name already used on
/// the left gets a `_right` suffix.
pub struct JoinAction;

#[async_trait]
impl Action for JoinAction {
    async fn execute(
        &self,
        node: &Node,
        inputs: Vec<Artifact>,
        _flow_vars: &[FlowVariable],
    ) -> Result<Option<Artifact>> {
        let [left, right] = inputs.as_slice() else {
            return Err(node_error("join", format!("2 expected, {} provided", inputs.len())));
        };
        let on = node.option("on")?.as_str()?;
        let keep_unmatched = match node.option("how")?.as_str()?.as_str() {
            "inner" => false,
            "left" => true,
            other => return Err(node_error("join", format!("unsupported join type '{}'", other))),
        };

        let table = join(left, right, &on, keep_unmatched).map_err(|e| node_error("join", e))?;
        Ok(Some(Arc::new(table)))
    }
}

fn join(
    left: &Table,
    right: &Table,
    on: &str,
    keep_unmatched: bool,
) -> Result<Table> {
    let left_on = left.column_index(on)?;
    let right_on = right.column_index(on)?;

    let right_cols: Vec<usize> = (0..right.num_columns()).filter(|i| *i != right_on).collect();
    let mut columns = left.columns().to_vec();
    for i in right_cols.iter() {
        let name = &right.columns()[*i];
        if left.columns().contains(name) {
            columns.push(format!("{}_right", name));
        } else {
            columns.push(name.clone());
        }
    }

    let mut lookup: HashMap<&str, Vec<&Vec<String>>> = HashMap::new();
    for row in right.rows() {
        lookup.entry(row[right_on].as_str()).or_default().push(row);
    }

    let mut out = Table::new(columns);
    for row in left.rows() {
        match lookup.get(row[left_on].as_str()) {
            Some(matches) => {
                for m in matches {
                    let mut joined = row.clone();
                    joined.extend(right_cols.iter().map(|i| m[*i].clone()));
                    out.push_row(joined)?;
                }
            }
            None if keep_unmatched => {
                let mut joined = row.clone();
                joined.resize(out.num_columns(), String::new());
                out.push_row(joined)?;
            }
            None => {}
        }
    }
    Ok(out)
}

pub fn descriptor() -> NodeDescriptor {
    NodeDescriptor::new("JoinNode", "Joiner", NodeCategory::Manipulation, JoinAction)
        .inputs(Arity::UpTo(2))
        .description("Combine two tables on a shared column")
        .option("on", Parameter::string("Join Column").with_docstring("Name of column to join on"))
        .option("how", Parameter::choice("Join Type", &["inner", "left"]).with_default("inner").with_docstring("Rows to keep when the right table has no match"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TabflowError, model::NodeModel, workflow::NodeRegistry};

    fn join_node(how: &str) -> Node {
        let record = NodeModel::new("j", NodeCategory::Manipulation, "JoinNode").with_option("on", "id").with_option("how", how);
        NodeRegistry::builtin().create(&record).unwrap()
    }

    fn people() -> Artifact {
        Arc::new(Table::from_rows(&["id", "name"], &[&["1", "ann"], &["2", "bob"], &["3", "cid"]]).unwrap())
    }

    fn scores() -> Artifact {
        Arc::new(Table::from_rows(&["id", "name", "score"], &[&["1", "A", "90"], &["3", "C", "70"], &["1", "A2", "80"]]).unwrap())
    }

    #[tokio::test]
    async fn test_inner_join() {
        let out = join_node("inner").execute(vec![people(), scores()], &[]).await.unwrap().unwrap();
        assert_eq!(out.columns(), &["id", "name", "name_right", "score"]);
        assert_eq!(out.num_rows(), 3);
        assert_eq!(out.rows()[0], vec!["1", "ann", "A", "90"]);
        assert_eq!(out.rows()[1], vec!["1", "ann", "A2", "80"]);
        assert_eq!(out.rows()[2], vec!["3", "cid", "C", "70"]);
    }

    #[tokio::test]
    async fn test_left_join_keeps_unmatched() {
        let out = join_node("left").execute(vec![people(), scores()], &[]).await.unwrap().unwrap();
        assert_eq!(out.num_rows(), 4);
        assert_eq!(out.rows()[2], vec!["2", "bob", "", ""]);
    }

    #[tokio::test]
    async fn test_join_with_one_input() {
        let node = join_node("inner");
        assert!(node.check_arity(1).is_ok());

        let err = node.execute(vec![people()], &[]).await.unwrap_err();
        assert!(matches!(err, TabflowError::NodeExecution(_)));
        assert!(err.to_string().contains("2 expected, 1 provided"));
    }
}
