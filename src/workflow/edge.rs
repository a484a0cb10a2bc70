//! Edge weights of the workflow graph.

use serde_json::{Map, Value};

/// A dependency `source -> target`: the target consumes the source's artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Edge {
    /// insertion sequence, orders a node's inputs
    pub seq: u64,
    /// attributes this crate does not interpret, kept for round trips
    pub attributes: Map<String, Value>,
}

impl Edge {
    pub fn new(seq: u64) -> Self {
        Self {
            seq,
            attributes: Map::new(),
        }
    }

    pub fn with_attributes(
        mut self,
        attributes: Map<String, Value>,
    ) -> Self {
        self.attributes = attributes;
        self
    }
}
