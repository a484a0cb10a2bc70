use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::{
    Result, TabflowError,
    workflow::{
        actions::{Action, node_error, single_input},
        node::{Arity, FlowVariable, Node, NodeCategory},
        parameter::Parameter,
        registry::NodeDescriptor,
        table::{Artifact, Table},
    },
};

use super::models::{Accumulator, AggFunc};

/// Spreadsheet-style pivot table.
///
/// Rows are grouped by the `index` column; with `columns` set every distinct
/// value of that column becomes an output column, otherwise a single column
/// named after `values` holds the aggregate. Groups and columns keep the order
/// in which they first appear. Empty cells are ignored and cells with no
/// values read as `fill_value`.
pub struct PivotAction;

#[async_trait]
impl Action for PivotAction {
    async fn execute(
        &self,
        node: &Node,
        inputs: Vec<Artifact>,
        _flow_vars: &[FlowVariable],
    ) -> Result<Option<Artifact>> {
        let input = single_input("pivot", &inputs)?;
        let index = node.option("index")?.as_str()?;
        let columns = node.option("columns")?.as_opt_str()?;
        let values = node.option("values")?.as_str()?;
        let aggfunc: AggFunc = node.option("aggfunc")?.as_str()?.parse().map_err(|e| node_error("pivot", e))?;
        let fill_value = node.option("fill_value")?.as_opt_str()?.unwrap_or_default();

        let table = pivot(&input, &index, columns.as_deref(), &values, aggfunc, &fill_value).map_err(|e| node_error("pivot", e))?;
        Ok(Some(Arc::new(table)))
    }
}

fn pivot(
    input: &Table,
    index: &str,
    columns: Option<&str>,
    values: &str,
    aggfunc: AggFunc,
    fill_value: &str,
) -> Result<Table> {
    let index_idx = input.column_index(index)?;
    let columns_idx = columns.map(|c| input.column_index(c)).transpose()?;
    let values_idx = input.column_index(values)?;

    let mut groups: Vec<String> = Vec::new();
    let mut headers: Vec<String> = Vec::new();
    let mut cells: HashMap<(usize, usize), Accumulator> = HashMap::new();

    for row in input.rows() {
        let g = position_or_push(&mut groups, &row[index_idx]);
        let c = match columns_idx {
            Some(idx) => position_or_push(&mut headers, &row[idx]),
            None => 0,
        };

        let cell = row[values_idx].trim();
        if cell.is_empty() {
            continue;
        }
        let acc = cells.entry((g, c)).or_default();
        if aggfunc.is_numeric() {
            let v = cell.parse::<f64>().map_err(|_| TabflowError::Convert(format!("value '{}' in column '{}' is not numeric", cell, values)))?;
            acc.push(v);
        } else {
            acc.push_count();
        }
    }

    if columns_idx.is_none() {
        headers.push(values.to_string());
    }

    let mut out = Table::new(std::iter::once(index.to_string()).chain(headers.iter().cloned()).collect());
    for (g, group) in groups.iter().enumerate() {
        let mut row = vec![group.clone()];
        for c in 0..headers.len() {
            let cell = cells.get(&(g, c)).and_then(|acc| acc.finish(aggfunc));
            row.push(cell.unwrap_or_else(|| fill_value.to_string()));
        }
        out.push_row(row)?;
    }
    Ok(out)
}

fn position_or_push(
    keys: &mut Vec<String>,
    key: &str,
) -> usize {
    match keys.iter().position(|k| k == key) {
        Some(pos) => pos,
        None => {
            keys.push(key.to_string());
            keys.len() - 1
        }
    }
}

pub fn descriptor() -> NodeDescriptor {
    NodeDescriptor::new("PivotNode", "Pivoting", NodeCategory::Manipulation, PivotAction)
        .inputs(Arity::UpTo(1))
        .description("Aggregate values into a pivot table")
        .option("index", Parameter::string("Index").with_docstring("Column to group rows by"))
        .option("columns", Parameter::string("Column Name Row").optional().with_docstring("Column whose values become the new columns"))
        .option("values", Parameter::string("Values").with_docstring("Column name to use to populate new frame's values"))
        .option("aggfunc", Parameter::choice("Aggregation function", &AggFunc::ALL).with_default("mean").with_docstring("Function used for aggregation"))
        .option("fill_value", Parameter::string("Fill value").with_default("").with_docstring("Value to replace missing values with"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TabflowError, model::NodeModel, workflow::NodeRegistry};

    fn sales() -> Artifact {
        Arc::new(
            Table::from_rows(
                &["region", "year", "sales"],
                &[&["emea", "2023", "10"], &["apac", "2023", "4"], &["emea", "2024", "20"], &["emea", "2023", "30"]],
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_pivot_with_columns() {
        let record = NodeModel::new("p", NodeCategory::Manipulation, "PivotNode")
            .with_option("index", "region")
            .with_option("columns", "year")
            .with_option("values", "sales")
            .with_option("aggfunc", "sum")
            .with_option("fill_value", "0");
        let node = NodeRegistry::builtin().create(&record).unwrap();
        assert!(node.validate().is_ok());

        let out = node.execute(vec![sales()], &[]).await.unwrap().unwrap();
        assert_eq!(out.columns(), &["region", "2023", "2024"]);
        assert_eq!(out.rows()[0], vec!["emea", "40", "20"]);
        assert_eq!(out.rows()[1], vec!["apac", "4", "0"]);
    }

    #[tokio::test]
    async fn test_pivot_default_mean_without_columns() {
        let record = NodeModel::new("p", NodeCategory::Manipulation, "PivotNode").with_option("index", "region").with_option("values", "sales");
        let node = NodeRegistry::builtin().create(&record).unwrap();
        assert!(node.validate().is_ok());

        let out = node.execute(vec![sales()], &[]).await.unwrap().unwrap();
        assert_eq!(out.columns(), &["region", "sales"]);
        assert_eq!(out.rows()[0], vec!["emea", "20"]);
        assert_eq!(out.rows()[1], vec!["apac", "4"]);
    }

    #[tokio::test]
    async fn test_pivot_non_numeric_values() {
        let record = NodeModel::new("p", NodeCategory::Manipulation, "PivotNode").with_option("index", "sales").with_option("values", "region");
        let node = NodeRegistry::builtin().create(&record).unwrap();

        let err = node.execute(vec![sales()], &[]).await.unwrap_err();
        assert!(matches!(err, TabflowError::NodeExecution(_)));
        assert!(err.to_string().starts_with("pivot: "));
    }

    #[tokio::test]
    async fn test_pivot_count_accepts_text() {
        let record = NodeModel::new("p", NodeCategory::Manipulation, "PivotNode")
            .with_option("index", "year")
            .with_option("values", "region")
            .with_option("aggfunc", "count");
        let node = NodeRegistry::builtin().create(&record).unwrap();

        let out = node.execute(vec![sales()], &[]).await.unwrap().unwrap();
        assert_eq!(out.rows()[0], vec!["2023", "3"]);
        assert_eq!(out.rows()[1], vec!["2024", "1"]);
    }
}
