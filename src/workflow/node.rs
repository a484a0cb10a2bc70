use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    Result, TabflowError,
    common::Vars,
    model::NodeModel,
    workflow::{
        actions::Action,
        parameter::Parameter,
        table::Artifact,
        template,
    },
};

/// node id
pub type NodeId = String;

/// Option names every flow node declares.
pub const FLOW_VAR_NAME: &str = "var_name";
pub const FLOW_DEFAULT_VALUE: &str = "default_value";

/// Top-level grouping of node types.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeCategory {
    /// Publishes flow variables, transforms nothing.
    Flow,
    /// Reads from or writes to external resources.
    Io,
    /// Reshapes or combines tables.
    Manipulation,
}

impl NodeCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeCategory::Flow => "Flow Control",
            NodeCategory::Io => "I/O",
            NodeCategory::Manipulation => "Manipulation",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            NodeCategory::Flow => "purple",
            NodeCategory::Io => "black",
            NodeCategory::Manipulation => "goldenrod",
        }
    }

    /// Options shared by every type of the category; type defaults win over these.
    pub fn default_options(&self) -> Vars {
        let mut vars = Vars::new();
        if let NodeCategory::Io = self {
            vars.set("sep", ",");
        }
        vars
    }
}

/// Declared number of inputs a node accepts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "mode", content = "count", rename_all = "snake_case")]
pub enum Arity {
    /// Exactly `n` inputs, used by sinks.
    Exact(usize),
    /// Anywhere from zero to `n` inputs.
    UpTo(usize),
}

impl Arity {
    pub fn max(&self) -> usize {
        match self {
            Arity::Exact(n) | Arity::UpTo(n) => *n,
        }
    }

    pub fn check(
        &self,
        key: &str,
        received: usize,
    ) -> Result<()> {
        match *self {
            Arity::Exact(n) if received != n => Err(TabflowError::NodeExecution(format!(
                "{} needs {} inputs: {} expected, {} provided",
                key, n, n, received
            ))),
            Arity::UpTo(n) if received > n => Err(TabflowError::NodeExecution(format!(
                "{} can take up to {} inputs: {} provided",
                key, n, received
            ))),
            _ => Ok(()),
        }
    }
}

/// State of a node during one run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeState {
    #[default]
    Pending,
    /// all predecessors are terminal
    Ready,
    Running,
    Succeeded,
    Failed,
    /// an ancestor failed or the run was cancelled first
    Skipped,
}

impl NodeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeState::Succeeded | NodeState::Failed | NodeState::Skipped)
    }
}

/// A named value published by a flow node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FlowVariable {
    pub name: String,
    pub value: Value,
}

impl FlowVariable {
    pub fn new<T: Into<Value>>(
        name: &str,
        value: T,
    ) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// A materialized node: identity, contract and its own copy of the parameters.
#[derive(Clone)]
pub struct Node {
    /// node id
    pub id: NodeId,
    /// display name
    pub name: String,
    /// visible across sub-graphs
    pub is_global: bool,
    /// opaque presentation data
    pub data: Value,
    category: NodeCategory,
    type_key: String,
    arity: Arity,
    num_out: usize,
    parameters: Vec<(String, Parameter)>,
    /// option values the node type does not declare
    extra_options: Vars,
    /// record attributes carried through untouched
    attributes: Map<String, Value>,
    action: Arc<dyn Action>,
}

impl std::fmt::Debug for Node {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type_key", &self.type_key)
            .field("category", &self.category)
            .field("arity", &self.arity)
            .field("options", &self.option_values())
            .finish()
    }
}

impl Node {
    pub(crate) fn new(
        category: NodeCategory,
        type_key: &str,
        arity: Arity,
        num_out: usize,
        parameters: Vec<(String, Parameter)>,
        action: Arc<dyn Action>,
        record: &NodeModel,
    ) -> Self {
        let mut node = Self {
            id: record.id.clone(),
            name: record.display_name.clone(),
            is_global: record.is_global,
            data: record.data.clone(),
            category,
            type_key: type_key.to_string(),
            arity,
            num_out,
            parameters,
            extra_options: Vars::new(),
            attributes: record.extra.clone(),
            action,
        };
        for (name, value) in record.options.iter() {
            node.set_option(name, value.clone());
        }
        node
    }

    pub fn category(&self) -> NodeCategory {
        self.category
    }

    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn num_out(&self) -> usize {
        self.num_out
    }

    pub fn is_flow(&self) -> bool {
        self.category == NodeCategory::Flow
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&str, &Parameter)> {
        self.parameters.iter().map(|(name, p)| (name.as_str(), p))
    }

    pub fn parameter(
        &self,
        name: &str,
    ) -> Option<&Parameter> {
        self.parameters.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn parameter_mut(
        &mut self,
        name: &str,
    ) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    /// Declared parameter, or a `Parameter` error naming the node.
    pub fn option(
        &self,
        name: &str,
    ) -> Result<&Parameter> {
        self.parameter(name).ok_or_else(|| TabflowError::Parameter(format!("{} has no option '{}'", self.type_key, name)))
    }

    /// Assign an option value without validating it.
    pub fn set_option<T: Into<Value>>(
        &mut self,
        name: &str,
        value: T,
    ) {
        match self.parameter_mut(name) {
            Some(param) => param.set_value(value),
            None => self.extra_options.set(name, value),
        }
    }

    /// Assigned option values, undeclared ones included.
    pub fn option_values(&self) -> Vars {
        let mut vars = Vars::new();
        for (name, param) in self.parameters.iter() {
            if let Some(value) = param.value() {
                vars.set(name, value.clone());
            }
        }
        vars.extend(&self.extra_options);
        vars
    }

    /// Full parameter validation, run right before execution.
    pub fn validate(&self) -> Result<()> {
        for (name, param) in self.parameters.iter() {
            param.validate().map_err(|e| self.option_error(name, e))?;
        }
        Ok(())
    }

    /// Type conformance of assigned values only, run when the node is stored.
    pub fn check_options(&self) -> Result<()> {
        for (name, param) in self.parameters.iter() {
            param.check_type().map_err(|e| self.option_error(name, e))?;
        }
        Ok(())
    }

    fn option_error(
        &self,
        name: &str,
        err: TabflowError,
    ) -> TabflowError {
        TabflowError::ParameterValidation(format!("node {} option '{}': {}", self.id, name, err))
    }

    pub fn check_arity(
        &self,
        received: usize,
    ) -> Result<()> {
        self.arity.check(&self.type_key, received)
    }

    /// Overwrite parameters named like a visible flow variable, then expand
    /// `{{$name$}}` references inside the remaining string values.
    ///
    /// Only this instance changes; the type's templates are never touched.
    pub fn apply_flow_vars(
        &mut self,
        flow_vars: &[FlowVariable],
    ) -> Result<()> {
        for var in flow_vars {
            if let Some(param) = self.parameter_mut(&var.name) {
                param.set_value(var.value.clone());
            }
        }

        for (_, param) in self.parameters.iter_mut() {
            if let Some(Value::String(s)) = param.value() {
                if template::has_references(s) {
                    let resolved = template::resolve_template(s, flow_vars)?;
                    param.set_value(resolved);
                }
            }
        }
        Ok(())
    }

    /// The variable a flow node publishes, read from its options.
    pub fn flow_variable(&self) -> Result<FlowVariable> {
        let name = self.option(FLOW_VAR_NAME)?.as_str()?;
        let value = self.option(FLOW_DEFAULT_VALUE)?.get_value()?.clone();
        Ok(FlowVariable {
            name,
            value,
        })
    }

    pub async fn execute(
        &self,
        inputs: Vec<Artifact>,
        flow_vars: &[FlowVariable],
    ) -> Result<Option<Artifact>> {
        self.action.execute(self, inputs, flow_vars).await
    }

    /// Attribute record reflecting the node's current fields.
    pub fn to_model(&self) -> NodeModel {
        NodeModel {
            id: self.id.clone(),
            category: self.category,
            type_key: self.type_key.clone(),
            display_name: self.name.clone(),
            data: self.data.clone(),
            is_global: self.is_global,
            options: self.option_values(),
            extra: self.attributes.clone(),
        }
    }
}

/// Outcome of one node in a run.
#[derive(Serialize, Debug, Clone, Default)]
pub struct NodeResult {
    /// terminal state
    pub state: NodeState,
    /// produced table, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    /// failure attributed to this node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TabflowError>,
    /// why the node never ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    pub started_at: Option<i64>,
    pub ended_at: Option<i64>,
}

impl NodeResult {
    pub fn succeeded(
        artifact: Option<Artifact>,
        started_at: i64,
        ended_at: i64,
    ) -> Self {
        Self {
            state: NodeState::Succeeded,
            artifact,
            started_at: Some(started_at),
            ended_at: Some(ended_at),
            ..Default::default()
        }
    }

    pub fn failed(
        error: TabflowError,
        started_at: i64,
        ended_at: i64,
    ) -> Self {
        Self {
            state: NodeState::Failed,
            error: Some(error),
            started_at: Some(started_at),
            ended_at: Some(ended_at),
            ..Default::default()
        }
    }

    pub fn skipped(reason: String) -> Self {
        Self {
            state: NodeState::Skipped,
            skip_reason: Some(reason),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::workflow::NodeRegistry;

    fn head_node(limit: Option<&str>) -> Node {
        let mut record = NodeModel::new("head", NodeCategory::Manipulation, "HeadNode");
        if let Some(limit) = limit {
            record = record.with_option("limit", limit);
        }
        NodeRegistry::builtin().create(&record).unwrap()
    }

    #[test]
    fn test_exact_arity() {
        let arity = Arity::Exact(1);
        assert!(arity.check("WriteCsvNode", 1).is_ok());

        let err = arity.check("WriteCsvNode", 0).unwrap_err();
        assert_eq!(err, TabflowError::NodeExecution("WriteCsvNode needs 1 inputs: 1 expected, 0 provided".to_string()));
        assert!(arity.check("WriteCsvNode", 2).is_err());
    }

    #[test]
    fn test_up_to_arity() {
        let arity = Arity::UpTo(2);
        for n in 0..=2 {
            assert!(arity.check("JoinNode", n).is_ok());
        }
        let err = arity.check("JoinNode", 3).unwrap_err();
        assert!(matches!(err, TabflowError::NodeExecution(_)));
        assert!(err.to_string().contains("up to 2"));
    }

    #[test]
    fn test_node_state_terminal() {
        assert!(!NodeState::Pending.is_terminal());
        assert!(!NodeState::Running.is_terminal());
        assert!(NodeState::Skipped.is_terminal());
        assert!(NodeState::Failed.is_terminal());
    }

    #[test]
    fn test_flow_var_substitution_fills_unset_parameter() {
        let mut node = head_node(None);
        assert!(node.validate().is_err());
        assert!(node.check_options().is_ok());

        node.apply_flow_vars(&[FlowVariable::new("limit", "10")]).unwrap();
        assert_eq!(node.option("limit").unwrap().get_value().unwrap(), &json!("10"));
        assert!(node.validate().is_ok());
        assert_eq!(node.option("limit").unwrap().as_i64().unwrap(), 10);
    }

    #[test]
    fn test_flow_var_substitution_ignores_unrelated_names() {
        let mut node = head_node(Some("3"));
        node.apply_flow_vars(&[FlowVariable::new("other", "10")]).unwrap();
        assert_eq!(node.option("limit").unwrap().as_i64().unwrap(), 3);
    }

    #[test]
    fn test_flow_var_template_reference() {
        let record = NodeModel::new("read", NodeCategory::Io, "ReadCsvNode").with_option("file", "/data/{{$region$}}.csv");
        let mut node = NodeRegistry::builtin().create(&record).unwrap();

        node.apply_flow_vars(&[FlowVariable::new("region", "emea")]).unwrap();
        assert_eq!(node.option("file").unwrap().as_str().unwrap(), "/data/emea.csv");

        let mut unresolved = NodeRegistry::builtin().create(&record).unwrap();
        assert!(unresolved.apply_flow_vars(&[]).is_err());
    }

    #[test]
    fn test_undeclared_options_are_kept() {
        let record = NodeModel::new("head", NodeCategory::Manipulation, "HeadNode").with_option("limit", 5).with_option("note", "keep me");
        let node = NodeRegistry::builtin().create(&record).unwrap();

        assert!(node.parameter("note").is_none());
        let model = node.to_model();
        assert_eq!(model.options.get::<String>("note"), Some("keep me".to_string()));
        assert_eq!(model.options.get::<i64>("limit"), Some(5));
    }

    #[test]
    fn test_flow_variable_from_options() {
        let record = NodeModel::new("var", NodeCategory::Flow, "StringNode").with_option("default_value", "10").with_option("var_name", "limit");
        let node = NodeRegistry::builtin().create(&record).unwrap();
        assert!(node.is_flow());
        assert_eq!(node.flow_variable().unwrap(), FlowVariable::new("limit", "10"));
    }

    #[test]
    fn test_validation_error_names_node_and_option() {
        let record = NodeModel::new("w1", NodeCategory::Io, "WriteCsvNode").with_option("file", "out.csv").with_option("index", "maybe");
        let node = NodeRegistry::builtin().create(&record).unwrap();
        let err = node.validate().unwrap_err();
        assert!(matches!(err, TabflowError::ParameterValidation(_)));
        assert!(err.to_string().contains("node w1 option 'index'"));
    }
}
