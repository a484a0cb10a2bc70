use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{common::Vars, workflow::NodeCategory};

/// Attribute record of one node as stored in a workflow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeModel {
    pub id: String,
    pub category: NodeCategory,
    pub type_key: String,
    #[serde(default)]
    pub display_name: String,
    /// opaque presentation data owned by the UI
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub is_global: bool,
    #[serde(default)]
    pub options: Vars,
    /// attributes this crate does not interpret, kept for round trips
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeModel {
    pub fn new(
        id: &str,
        category: NodeCategory,
        type_key: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            category,
            type_key: type_key.to_string(),
            display_name: String::new(),
            data: Value::Null,
            is_global: false,
            options: Vars::new(),
            extra: Map::new(),
        }
    }

    pub fn with_display_name(
        mut self,
        display_name: &str,
    ) -> Self {
        self.display_name = display_name.to_string();
        self
    }

    pub fn with_option<T: Into<Value>>(
        mut self,
        name: &str,
        value: T,
    ) -> Self {
        self.options.set(name, value);
        self
    }

    pub fn with_data(
        mut self,
        data: Value,
    ) -> Self {
        self.data = data;
        self
    }

    pub fn global(mut self) -> Self {
        self.is_global = true;
        self
    }
}
