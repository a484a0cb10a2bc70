//! Explicit table of every known node type.
//!
//! The registry is filled once at start-up and then shared read-only
//! (`Arc<NodeRegistry>`); lookups need no locking.

use std::{collections::{BTreeMap, HashMap}, sync::Arc};

use serde::Serialize;
use tracing::trace;

use crate::{
    Result, TabflowError,
    common::Vars,
    model::NodeModel,
    workflow::{
        actions::{self, Action},
        node::{Arity, Node, NodeCategory},
        parameter::Parameter,
    },
};

/// Static declaration of one node type.
#[derive(Clone)]
pub struct NodeDescriptor {
    key: String,
    name: String,
    category: NodeCategory,
    arity: Arity,
    num_out: usize,
    color: Option<String>,
    description: String,
    options: Vec<(String, Parameter)>,
    action: Arc<dyn Action>,
}

impl NodeDescriptor {
    pub fn new(
        key: &str,
        name: &str,
        category: NodeCategory,
        action: impl Action + 'static,
    ) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            category,
            arity: Arity::UpTo(1),
            num_out: 1,
            color: None,
            description: String::new(),
            options: Vec::new(),
            action: Arc::new(action),
        }
    }

    pub fn inputs(
        mut self,
        arity: Arity,
    ) -> Self {
        self.arity = arity;
        self
    }

    pub fn outputs(
        mut self,
        num_out: usize,
    ) -> Self {
        self.num_out = num_out;
        self
    }

    pub fn color(
        mut self,
        color: &str,
    ) -> Self {
        self.color = Some(color.to_string());
        self
    }

    pub fn description(
        mut self,
        description: &str,
    ) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn option(
        mut self,
        name: &str,
        param: Parameter,
    ) -> Self {
        self.options.push((name.to_string(), param));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn category(&self) -> NodeCategory {
        self.category
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Category defaults overridden by this type's own defaults.
    pub fn default_options(&self) -> Vars {
        let mut vars = self.category.default_options();
        for (name, param) in self.options.iter() {
            if let Some(default) = param.default_value() {
                vars.set(name, default.clone());
            }
        }
        vars
    }

    /// Materialize a node from a stored record, cloning the option templates.
    pub fn instantiate(
        &self,
        record: &NodeModel,
    ) -> Node {
        Node::new(self.category, &self.key, self.arity, self.num_out, self.options.clone(), self.action.clone(), record)
    }

    fn info(&self) -> NodeTypeInfo {
        NodeTypeInfo {
            name: self.name.clone(),
            key: self.key.clone(),
            category: self.category,
            num_in: self.arity.max(),
            arity: self.arity,
            num_out: self.num_out,
            color: self.color.clone().unwrap_or_else(|| self.category.color().to_string()),
            description: self.description.clone(),
            default_options: self.default_options(),
            option_types: self.options.iter().cloned().collect(),
        }
    }
}

/// Catalog entry for one node type, consumed by presentation layers.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NodeTypeInfo {
    pub name: String,
    pub key: String,
    pub category: NodeCategory,
    pub num_in: usize,
    pub arity: Arity,
    pub num_out: usize,
    pub color: String,
    pub description: String,
    pub default_options: Vars,
    pub option_types: BTreeMap<String, Parameter>,
}

/// Node types grouped by category, each group in registration order.
pub type Catalog = BTreeMap<NodeCategory, Vec<NodeTypeInfo>>;

#[derive(Clone, Default)]
pub struct NodeRegistry {
    descriptors: HashMap<String, NodeDescriptor>,
    order: Vec<String>,
}

impl NodeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in node type.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for descriptor in actions::builtin_descriptors() {
            // keys of the built-in set are distinct
            let _ = registry.register(descriptor);
        }
        registry
    }

    pub fn register(
        &mut self,
        descriptor: NodeDescriptor,
    ) -> Result<()> {
        if self.descriptors.contains_key(descriptor.key()) {
            return Err(TabflowError::Registry(format!("node type {} is already registered", descriptor.key())));
        }
        trace!(key = descriptor.key(), category = ?descriptor.category(), "register node type");
        self.order.push(descriptor.key().to_string());
        self.descriptors.insert(descriptor.key().to_string(), descriptor);
        Ok(())
    }

    pub fn contains(
        &self,
        key: &str,
    ) -> bool {
        self.descriptors.contains_key(key)
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Result<&NodeDescriptor> {
        self.descriptors.get(key).ok_or_else(|| TabflowError::UnknownNodeType(key.to_string()))
    }

    /// Look up the record's type key and bind its option values onto a fresh node.
    pub fn create(
        &self,
        record: &NodeModel,
    ) -> Result<Node> {
        Ok(self.get(&record.type_key)?.instantiate(record))
    }

    pub fn list_types(&self) -> Catalog {
        let mut catalog = Catalog::new();
        for key in self.order.iter() {
            if let Some(descriptor) = self.descriptors.get(key) {
                catalog.entry(descriptor.category()).or_default().push(descriptor.info());
            }
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::workflow::{FlowVariable, table::Artifact};

    struct Noop;

    #[async_trait]
    impl Action for Noop {
        async fn execute(
            &self,
            _: &Node,
            _: Vec<Artifact>,
            _: &[FlowVariable],
        ) -> Result<Option<Artifact>> {
            Ok(None)
        }
    }

    #[test]
    fn test_create_unknown_type() {
        let registry = NodeRegistry::builtin();
        let record = NodeModel::new("x", NodeCategory::Manipulation, "SortNode");
        let err = registry.create(&record).unwrap_err();
        assert_eq!(err, TabflowError::UnknownNodeType("SortNode".to_string()));
    }

    #[test]
    fn test_create_binds_options() {
        let registry = NodeRegistry::builtin();
        let record = NodeModel::new("r", NodeCategory::Io, "ReadCsvNode").with_option("file", "in.csv").with_display_name("Sales");
        let node = registry.create(&record).unwrap();

        assert_eq!(node.type_key(), "ReadCsvNode");
        assert_eq!(node.name, "Sales");
        assert_eq!(node.option("file").unwrap().as_str().unwrap(), "in.csv");
        assert_eq!(node.option("sep").unwrap().as_str().unwrap(), ",");
        assert_eq!(node.arity(), Arity::UpTo(0));
    }

    #[test]
    fn test_instances_do_not_share_parameters() {
        let registry = NodeRegistry::builtin();
        let mut a = registry.create(&NodeModel::new("a", NodeCategory::Manipulation, "HeadNode")).unwrap();
        let b = registry.create(&NodeModel::new("b", NodeCategory::Manipulation, "HeadNode")).unwrap();

        a.set_option("limit", 3);
        assert!(a.option("limit").unwrap().is_set());
        assert!(!b.option("limit").unwrap().is_set());
    }

    #[test]
    fn test_register_duplicate() {
        let mut registry = NodeRegistry::builtin();
        let err = registry.register(NodeDescriptor::new("JoinNode", "Joiner", NodeCategory::Manipulation, Noop)).unwrap_err();
        assert!(matches!(err, TabflowError::Registry(_)));
    }

    #[test]
    fn test_list_types_groups_and_merges_defaults() {
        let registry = NodeRegistry::builtin();
        let catalog = registry.list_types();

        assert_eq!(catalog.keys().copied().collect::<Vec<_>>(), vec![NodeCategory::Flow, NodeCategory::Io, NodeCategory::Manipulation]);

        let io = &catalog[&NodeCategory::Io];
        let keys: Vec<&str> = io.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["ReadCsvNode", "WriteCsvNode"]);

        let write = &io[1];
        assert_eq!(write.num_in, 1);
        assert_eq!(write.arity, Arity::Exact(1));
        assert_eq!(write.num_out, 0);
        assert_eq!(write.color, "black");
        assert_eq!(write.default_options.get::<String>("sep"), Some(",".to_string()));
        assert_eq!(write.default_options.get::<bool>("index"), Some(true));

        let string_node = &catalog[&NodeCategory::Flow][0];
        assert_eq!(string_node.color, "purple");
        assert_eq!(string_node.default_options.get::<String>("var_name"), Some("my_var".to_string()));
    }

    #[test]
    fn test_custom_type_color_and_serialization() {
        let mut registry = NodeRegistry::new();
        registry
            .register(
                NodeDescriptor::new("NoopNode", "No-op", NodeCategory::Manipulation, Noop)
                    .inputs(Arity::UpTo(3))
                    .outputs(2)
                    .color("teal")
                    .description("Does nothing")
                    .option("label", Parameter::string("Label").with_default("x")),
            )
            .unwrap();

        let catalog = serde_json::to_value(registry.list_types()).unwrap();
        let entry = &catalog["manipulation"][0];
        assert_eq!(entry["key"], json!("NoopNode"));
        assert_eq!(entry["num_in"], json!(3));
        assert_eq!(entry["num_out"], json!(2));
        assert_eq!(entry["color"], json!("teal"));
        assert_eq!(entry["default_options"], json!({"label": "x"}));
        assert_eq!(entry["option_types"]["label"]["type"], json!("string"));
    }
}
