//! Mutable workflow graph.
//!
//! The workflow stores serialized node records (not materialized nodes) in a
//! petgraph [`StableDiGraph`], together with an id index. Records are turned
//! into [`Node`]s through a [`NodeRegistry`] whenever a caller or the engine
//! needs one. Insertion order is tracked with sequence numbers so that
//! topological ties and input ordering are deterministic.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
    io::Read,
};

use petgraph::{
    Direction,
    stable_graph::{NodeIndex, StableDiGraph},
    visit::{EdgeRef, IntoEdgeReferences},
};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::{
    Result, TabflowError,
    model::{EdgeModel, NodeModel, WorkflowModel, WorkflowSession},
    runtime::RunReport,
    workflow::{
        edge::Edge,
        node::{Node, NodeId},
        registry::NodeRegistry,
    },
};

/// Node weight: the stored record plus its insertion sequence.
#[derive(Debug, Clone)]
struct Slot {
    seq: u64,
    record: NodeModel,
}

#[derive(Debug, Clone, Default)]
pub struct Workflow {
    graph: StableDiGraph<Slot, Edge>,
    index: HashMap<NodeId, NodeIndex>,
    next_seq: u64,
    file_path: Option<String>,
    /// graph-level attributes carried through untouched
    attributes: Map<String, Value>,
}

impl Workflow {
    /// create an empty workflow
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    /// `None` unsets the path; a path must name a `.json` file.
    pub fn set_file_path(
        &mut self,
        path: Option<&str>,
    ) -> Result<()> {
        match path {
            None => self.file_path = None,
            Some(p) if p.ends_with(".json") => self.file_path = Some(p.to_string()),
            Some(p) => return Err(TabflowError::Graph(format!("workflow file must be a .json file, got '{}'", p))),
        }
        Ok(())
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Insert a new record or fully replace the one stored under the same id.
    ///
    /// A replaced record keeps its position and its edges.
    fn upsert_record(
        &mut self,
        record: NodeModel,
    ) {
        match self.index.get(&record.id) {
            Some(idx) => self.graph[*idx].record = record,
            None => {
                let seq = self.next_seq();
                let id = record.id.clone();
                let idx = self.graph.add_node(Slot {
                    seq,
                    record,
                });
                self.index.insert(id, idx);
            }
        }
    }

    fn node_index(
        &self,
        id: &str,
    ) -> Result<NodeIndex> {
        self.index.get(id).copied().ok_or_else(|| TabflowError::Graph(format!("node {} is not in the workflow", id)))
    }

    /// Store `node`'s current record; assigned option values must fit their types.
    ///
    /// Required options may still be unset here: they can be filled by flow
    /// variables when the workflow runs.
    pub fn add_or_update_node(
        &mut self,
        node: &Node,
    ) -> Result<()> {
        node.check_options().map_err(|e| TabflowError::Graph(format!("cannot store node {}: {}", node.id, e)))?;
        debug!(node_id = %node.id, type_key = node.type_key(), "store node");
        self.upsert_record(node.to_model());
        Ok(())
    }

    /// Connect two stored nodes; adding an existing edge again is a no-op.
    pub fn add_edge(
        &mut self,
        from: &Node,
        to: &Node,
    ) -> Result<()> {
        for node in [from, to] {
            node.check_options().map_err(|e| TabflowError::Graph(format!("cannot connect node {}: {}", node.id, e)))?;
        }
        self.add_edge_by_id(&from.id, &to.id)
    }

    pub fn add_edge_by_id(
        &mut self,
        source: &str,
        target: &str,
    ) -> Result<()> {
        self.insert_edge(source, target, Map::new())
    }

    fn insert_edge(
        &mut self,
        source: &str,
        target: &str,
        attributes: Map<String, Value>,
    ) -> Result<()> {
        let from = self.node_index(source)?;
        let to = self.node_index(target)?;
        if from == to {
            return Err(TabflowError::Graph(format!("node {} cannot be connected to itself", source)));
        }
        if self.graph.find_edge(from, to).is_some() {
            return Ok(());
        }
        let seq = self.next_seq();
        self.graph.add_edge(from, to, Edge::new(seq).with_attributes(attributes));
        debug!(source, target, "add edge");
        Ok(())
    }

    /// Remove a node and every edge touching it, returning its record.
    pub fn remove_node(
        &mut self,
        id: &str,
    ) -> Result<NodeModel> {
        let idx = self.node_index(id)?;
        self.index.remove(id);
        let slot = self.graph.remove_node(idx).ok_or_else(|| TabflowError::Graph(format!("node {} is not in the workflow", id)))?;
        debug!(node_id = id, "remove node");
        Ok(slot.record)
    }

    /// Materialize the stored node through `registry`.
    pub fn get_node(
        &self,
        id: &str,
        registry: &NodeRegistry,
    ) -> Result<Node> {
        let idx = self.node_index(id)?;
        registry.create(&self.graph[idx].record)
    }

    pub fn node_record(
        &self,
        id: &str,
    ) -> Option<&NodeModel> {
        self.index.get(id).map(|idx| &self.graph[*idx].record)
    }

    pub fn contains_node(
        &self,
        id: &str,
    ) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Node indices in insertion order.
    fn ordered_indices(&self) -> Vec<NodeIndex> {
        let mut indices: Vec<NodeIndex> = self.graph.node_indices().collect();
        indices.sort_by_key(|idx| self.graph[*idx].seq);
        indices
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.ordered_indices().into_iter().map(|idx| self.graph[idx].record.id.clone()).collect()
    }

    /// `(source, target)` pairs in insertion order.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges: Vec<_> = self.graph.edge_references().collect();
        edges.sort_by_key(|e| e.weight().seq);
        edges.into_iter().map(|e| (self.graph[e.source()].record.id.clone(), self.graph[e.target()].record.id.clone())).collect()
    }

    fn neighbors(
        &self,
        id: &str,
        direction: Direction,
    ) -> Result<Vec<NodeId>> {
        let idx = self.node_index(id)?;
        let mut edges: Vec<_> = self.graph.edges_directed(idx, direction).collect();
        edges.sort_by_key(|e| e.weight().seq);
        Ok(edges
            .into_iter()
            .map(|e| {
                let other = match direction {
                    Direction::Incoming => e.source(),
                    Direction::Outgoing => e.target(),
                };
                self.graph[other].record.id.clone()
            })
            .collect())
    }

    /// Direct predecessors, in the order their edges were added.
    pub fn predecessors(
        &self,
        id: &str,
    ) -> Result<Vec<NodeId>> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Direct successors, in the order their edges were added.
    pub fn successors(
        &self,
        id: &str,
    ) -> Result<Vec<NodeId>> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Kahn's algorithm; among ready nodes the earliest inserted goes first.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        let mut in_degree: HashMap<NodeIndex, usize> = self.graph.node_indices().map(|idx| (idx, self.graph.edges_directed(idx, Direction::Incoming).count())).collect();

        let mut ready: BinaryHeap<Reverse<(u64, NodeIndex)>> =
            in_degree.iter().filter(|(_, degree)| **degree == 0).map(|(idx, _)| Reverse((self.graph[*idx].seq, *idx))).collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((_, idx))) = ready.pop() {
            order.push(self.graph[idx].record.id.clone());
            for succ in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&succ) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse((self.graph[succ].seq, succ)));
                    }
                }
            }
        }

        if order.len() < self.graph.node_count() {
            let mut remaining: Vec<NodeIndex> = in_degree.into_iter().filter(|(_, degree)| *degree > 0).map(|(idx, _)| idx).collect();
            remaining.sort_by_key(|idx| self.graph[*idx].seq);
            let ids: Vec<&str> = remaining.iter().map(|idx| self.graph[*idx].record.id.as_str()).collect();
            return Err(TabflowError::CycleDetected(format!("workflow contains a cycle involving nodes: {}", ids.join(", "))));
        }
        Ok(order)
    }

    /// Node-link document with every stored attribute.
    pub fn to_model(&self) -> WorkflowModel {
        let nodes = self.ordered_indices().into_iter().map(|idx| self.graph[idx].record.clone()).collect();

        let mut edges: Vec<_> = self.graph.edge_references().collect();
        edges.sort_by_key(|e| e.weight().seq);
        let edges = edges
            .into_iter()
            .map(|e| EdgeModel {
                source: self.graph[e.source()].record.id.clone(),
                target: self.graph[e.target()].record.id.clone(),
                extra: e.weight().attributes.clone(),
            })
            .collect();

        WorkflowModel {
            nodes,
            edges,
            extra: self.attributes.clone(),
        }
    }

    /// Rebuild a workflow from a node-link document.
    ///
    /// Records are stored as they are; type keys and option values are
    /// checked when nodes are materialized. A repeated node id is rejected.
    pub fn from_model(model: &WorkflowModel) -> Result<Self> {
        let mut workflow = Self::new();
        workflow.attributes = model.extra.clone();
        for record in model.nodes.iter() {
            if workflow.contains_node(&record.id) {
                return Err(TabflowError::Graph(format!("duplicate node id {} in workflow document", record.id)));
            }
            workflow.upsert_record(record.clone());
        }
        for edge in model.edges.iter() {
            workflow.insert_edge(&edge.source, &edge.target, edge.extra.clone())?;
        }
        Ok(workflow)
    }

    pub fn to_json(&self) -> Result<String> {
        self.to_model().to_json()
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Self::from_model(&WorkflowModel::from_json(s)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let model: WorkflowModel = serde_json::from_reader(reader).map_err(|e| TabflowError::Graph(format!("invalid workflow document: {}", e)))?;
        Self::from_model(&model)
    }

    pub fn to_session(&self) -> WorkflowSession {
        WorkflowSession {
            graph: Some(self.to_model()),
            file_path: self.file_path.clone(),
        }
    }

    /// A session without a graph yields an empty workflow.
    pub fn from_session(session: &WorkflowSession) -> Result<Self> {
        let mut workflow = match &session.graph {
            Some(model) => Self::from_model(model)?,
            None => Self::new(),
        };
        workflow.set_file_path(session.file_path.as_deref())?;
        Ok(workflow)
    }

    /// Write each node's outcome of `report` into its record as `last_run`.
    pub fn record_run(
        &mut self,
        report: &RunReport,
    ) {
        for (id, result) in report.results.iter() {
            if let Some(idx) = self.index.get(id) {
                let mut last_run = json!({
                    "run_id": report.run_id,
                    "state": result.state.as_ref(),
                });
                if let Some(err) = &result.error {
                    last_run["error"] = Value::String(err.to_string());
                }
                if let Some(reason) = &result.skip_reason {
                    last_run["skip_reason"] = Value::String(reason.clone());
                }
                self.graph[*idx].record.extra.insert("last_run".to_string(), last_run);
            }
        }
    }

    /// Output a human-readable representation of the workflow graph
    pub fn schema(&self) -> String {
        let mut lines = Vec::new();

        lines.push("=== Workflow Graph ===".to_string());
        lines.push(format!("Nodes: {}, Edges: {}", self.node_count(), self.edge_count()));
        lines.push(String::new());

        lines.push("--- Nodes ---".to_string());
        for idx in self.ordered_indices() {
            let record = &self.graph[idx].record;
            lines.push(format!("[{}] {} (type: {}, category: {})", record.id, record.display_name, record.type_key, record.category.as_ref()));
        }
        lines.push(String::new());

        lines.push("--- Graph Structure ---".to_string());
        for id in self.node_ids() {
            let successors = self.successors(&id).unwrap_or_default();
            if successors.is_empty() {
                lines.push(format!("{} -> (end)", id));
            } else {
                lines.push(format!("{} -> {}", id, successors.join(", ")));
            }
        }

        lines.join("\n")
    }
}
