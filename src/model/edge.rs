use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeModel {
    pub source: String,
    pub target: String,
    /// attributes this crate does not interpret, kept for round trips
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EdgeModel {
    pub fn new(
        source: &str,
        target: &str,
    ) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            extra: Map::new(),
        }
    }
}
