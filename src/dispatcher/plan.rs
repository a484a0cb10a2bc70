//! Immutable snapshot of a workflow, resolved for one run.

use std::collections::{BTreeSet, HashMap};

use crate::{
    Result,
    workflow::{
        NodeRegistry, Workflow,
        node::{FlowVariable, Node, NodeId},
    },
};

/// Everything the dispatcher needs, computed before any node runs.
///
/// Building a plan is where structural errors surface: a cycle or an
/// unknown node type aborts the run before anything executes.
#[derive(Debug)]
pub struct ExecutionPlan {
    order: Vec<NodeId>,
    nodes: Vec<Node>,
    position: HashMap<NodeId, usize>,
    /// direct predecessors, in edge insertion order
    preds: Vec<Vec<usize>>,
    succs: Vec<Vec<usize>>,
    /// transitive predecessors, ascending topological position
    ancestors: Vec<BTreeSet<usize>>,
}

impl ExecutionPlan {
    pub fn build(
        workflow: &Workflow,
        registry: &NodeRegistry,
    ) -> Result<Self> {
        let order = workflow.topological_order()?;
        let nodes = order.iter().map(|nid| workflow.get_node(nid, registry)).collect::<Result<Vec<_>>>()?;
        let position: HashMap<NodeId, usize> = order.iter().enumerate().map(|(i, nid)| (nid.clone(), i)).collect();

        let mut preds = Vec::with_capacity(order.len());
        let mut succs = Vec::with_capacity(order.len());
        for nid in order.iter() {
            preds.push(workflow.predecessors(nid)?.iter().map(|p| position[p]).collect::<Vec<_>>());
            succs.push(workflow.successors(nid)?.iter().map(|s| position[s]).collect::<Vec<_>>());
        }

        // predecessors always sit at a lower position, so one forward pass suffices
        let mut ancestors: Vec<BTreeSet<usize>> = Vec::with_capacity(order.len());
        for i in 0..order.len() {
            let mut set = BTreeSet::new();
            for p in preds[i].iter() {
                set.insert(*p);
                set.extend(ancestors[*p].iter().copied());
            }
            ancestors.push(set);
        }

        Ok(Self {
            order,
            nodes,
            position,
            preds,
            succs,
            ancestors,
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn node_id(
        &self,
        pos: usize,
    ) -> &NodeId {
        &self.order[pos]
    }

    pub fn node(
        &self,
        pos: usize,
    ) -> &Node {
        &self.nodes[pos]
    }

    pub fn position(
        &self,
        nid: &str,
    ) -> Option<usize> {
        self.position.get(nid).copied()
    }

    pub fn preds(
        &self,
        pos: usize,
    ) -> &[usize] {
        &self.preds[pos]
    }

    pub fn succs(
        &self,
        pos: usize,
    ) -> &[usize] {
        &self.succs[pos]
    }

    /// Variables published by flow ancestors of `pos`, earliest first, so a
    /// later definition of the same name wins.
    pub fn visible_flow_vars(
        &self,
        pos: usize,
        published: &HashMap<usize, FlowVariable>,
    ) -> Vec<FlowVariable> {
        self.ancestors[pos].iter().filter_map(|a| published.get(a).cloned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TabflowError, model::WorkflowModel};

    fn workflow(doc: &str) -> Workflow {
        Workflow::from_model(&WorkflowModel::from_json(doc).unwrap()).unwrap()
    }

    const DIAMOND: &str = r#"{
        "nodes": [
            {"id": "var", "category": "flow", "type_key": "StringNode"},
            {"id": "a", "category": "io", "type_key": "ReadCsvNode"},
            {"id": "b", "category": "io", "type_key": "ReadCsvNode"},
            {"id": "join", "category": "manipulation", "type_key": "JoinNode"},
            {"id": "head", "category": "manipulation", "type_key": "HeadNode"}
        ],
        "edges": [
            {"source": "var", "target": "a"},
            {"source": "b", "target": "join"},
            {"source": "a", "target": "join"},
            {"source": "join", "target": "head"}
        ]
    }"#;

    #[test]
    fn test_plan_structure() {
        let plan = ExecutionPlan::build(&workflow(DIAMOND), &NodeRegistry::builtin()).unwrap();
        assert_eq!(plan.order(), &["var", "a", "b", "join", "head"]);

        let join = plan.position("join").unwrap();
        let preds: Vec<&str> = plan.preds(join).iter().map(|p| plan.node_id(*p).as_str()).collect();
        assert_eq!(preds, vec!["b", "a"]);
        assert_eq!(plan.node(join).type_key(), "JoinNode");
    }

    #[test]
    fn test_visible_flow_vars_follow_ancestry() {
        let plan = ExecutionPlan::build(&workflow(DIAMOND), &NodeRegistry::builtin()).unwrap();
        let published = HashMap::from([(0, FlowVariable::new("region", "emea"))]);

        let head = plan.position("head").unwrap();
        assert_eq!(plan.visible_flow_vars(head, &published), vec![FlowVariable::new("region", "emea")]);

        let b = plan.position("b").unwrap();
        assert!(plan.visible_flow_vars(b, &published).is_empty());
    }

    #[test]
    fn test_plan_rejects_unknown_type() {
        let doc = r#"{"nodes": [{"id": "s", "category": "manipulation", "type_key": "SortNode"}], "edges": []}"#;
        let err = ExecutionPlan::build(&workflow(doc), &NodeRegistry::builtin()).unwrap_err();
        assert_eq!(err, TabflowError::UnknownNodeType("SortNode".to_string()));
    }
}
