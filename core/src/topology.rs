use crate::identity::{FlowId, FlowRef};
use serde::{Deserialize, Serialize};

/// Structural snapshot of a coordinator's flow tree.
///
/// Serializable view used for inspection and tests. Nodes are listed
/// depth-first, root first.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Topology {
    pub label: String,
    pub nodes: Vec<TopologyNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyNode {
    pub node: FlowRef,
    pub id: FlowId,
    pub state_type: String,
    pub parent: Option<FlowRef>,
    pub depth: usize,
}

impl Topology {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn root(&self) -> Option<&TopologyNode> {
        self.nodes.first()
    }

    pub fn contains(&self, node: FlowRef) -> bool {
        self.nodes.iter().any(|n| n.node == node)
    }

    pub fn parent_of(&self, node: FlowRef) -> Option<FlowRef> {
        self.nodes.iter().find(|n| n.node == node)?.parent
    }

    /// Direct children of `node` in tree order.
    pub fn children_of(&self, node: FlowRef) -> Vec<FlowRef> {
        self.nodes
            .iter()
            .filter(|n| n.parent == Some(node))
            .map(|n| n.node)
            .collect()
    }

    /// First node (depth-first) labelled `id`.
    pub fn find_by_id(&self, id: &str) -> Option<&TopologyNode> {
        self.nodes.iter().find(|n| n.id.as_str() == id)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(node: FlowRef, id: &str, parent: Option<FlowRef>, depth: usize) -> TopologyNode {
        TopologyNode {
            node,
            id: FlowId::new(id),
            state_type: "Screen".to_string(),
            parent,
            depth,
        }
    }

    #[test]
    fn test_relationship_queries() {
        let root = FlowRef::allocate();
        let a = FlowRef::allocate();
        let b = FlowRef::allocate();
        let mut topology = Topology::new("app");
        topology.nodes = vec![
            node(root, "root", None, 0),
            node(a, "a", Some(root), 1),
            node(b, "b", Some(a), 2),
        ];

        assert_eq!(topology.root().map(|n| n.node), Some(root));
        assert_eq!(topology.children_of(root), vec![a]);
        assert_eq!(topology.parent_of(b), Some(a));
        assert_eq!(topology.find_by_id("b").map(|n| n.depth), Some(2));
        assert!(!topology.contains(FlowRef::allocate()));
    }

    #[test]
    fn test_to_json_shape() {
        let root = FlowRef::allocate();
        let mut topology = Topology::new("app");
        topology.nodes.push(node(root, "root", None, 0));

        let json = topology.to_json();
        assert_eq!(json["label"], "app");
        assert_eq!(json["nodes"][0]["id"], "root");
        assert_eq!(json["nodes"][0]["parent"], serde_json::Value::Null);
    }
}
