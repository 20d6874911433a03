use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;
use wisdomgraph_core::{ConceptEdge, ConceptNode, EdgeId, GraphError, NodeId, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeIndex(pub usize);

impl fmt::Display for EdgeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical node/edge store for one learning map.
///
/// Nodes keep their insertion order: the layout engine uses it to break ties
/// and the export codec uses it to write a stable document. Edges are an
/// ordered sequence. Both id spaces are unique and every edge endpoint
/// resolves to a node in the same model.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    nodes: Vec<ConceptNode>,
    edges: Vec<ConceptEdge>,
    node_map: HashMap<NodeId, NodeIndex>,
    edge_map: HashMap<EdgeId, EdgeIndex>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: ConceptNode) -> Result<NodeIndex, GraphError> {
        if self.node_map.contains_key(&node.id) {
            return Err(GraphError::DuplicateId(node.id));
        }
        let idx = NodeIndex(self.nodes.len());
        self.node_map.insert(node.id.clone(), idx);
        self.nodes.push(node);
        Ok(idx)
    }

    pub fn add_edge(&mut self, edge: ConceptEdge) -> Result<EdgeIndex, GraphError> {
        if self.edge_map.contains_key(&edge.id) {
            return Err(GraphError::DuplicateEdgeId(edge.id));
        }
        for endpoint in [&edge.source, &edge.target] {
            if !self.node_map.contains_key(endpoint) {
                return Err(GraphError::UnknownEndpoint {
                    edge: edge.id.clone(),
                    endpoint: endpoint.clone(),
                });
            }
        }
        let idx = EdgeIndex(self.edges.len());
        self.edge_map.insert(edge.id.clone(), idx);
        self.edges.push(edge);
        Ok(idx)
    }

    /// Removes a single edge, keeping the relative order of the rest.
    /// Nodes are never touched.
    pub fn remove_edge(&mut self, id: &EdgeId) -> Option<ConceptEdge> {
        let idx = self.edge_map.remove(id)?;
        let removed = self.edges.remove(idx.0);
        for (pos, edge) in self.edges.iter().enumerate().skip(idx.0) {
            self.edge_map.insert(edge.id.clone(), EdgeIndex(pos));
        }
        Some(removed)
    }

    pub fn nodes(&self) -> &[ConceptNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[ConceptEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_indices(&self) -> impl Iterator<Item = EdgeIndex> + use<> {
        (0..self.edges.len()).map(EdgeIndex)
    }

    pub fn node_index(&self, id: &NodeId) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node_map.contains_key(id)
    }

    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edge_map.contains_key(id)
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&ConceptNode> {
        self.node_map.get(id).map(|&idx| &self.nodes[idx.0])
    }

    pub fn edge_endpoints(&self, index: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        let edge = self.edges.get(index.0)?;
        Some((
            self.node_index(&edge.source)?,
            self.node_index(&edge.target)?,
        ))
    }

    pub fn set_position(&mut self, id: &NodeId, position: Position) -> bool {
        match self.node_map.get(id) {
            Some(&idx) => {
                self.nodes[idx.0].position = Some(position);
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_position_at(&mut self, index: NodeIndex, position: Position) {
        if let Some(node) = self.nodes.get_mut(index.0) {
            node.position = Some(position);
        }
    }

    /// True when every node carries a position.
    pub fn is_fully_positioned(&self) -> bool {
        self.nodes.iter().all(|node| node.position.is_some())
    }

    /// Nodes with no incoming edge. Self-loops do not count as incoming.
    pub fn roots(&self) -> Vec<NodeId> {
        let mut has_parent = vec![false; self.nodes.len()];
        for edge in &self.edges {
            if edge.is_self_loop() {
                continue;
            }
            if let Some(idx) = self.node_index(&edge.target) {
                has_parent[idx.0] = true;
            }
        }
        self.nodes
            .iter()
            .zip(has_parent)
            .filter(|(_, has_parent)| !has_parent)
            .map(|(node, _)| node.id.clone())
            .collect()
    }

    pub fn children_of(&self, id: &NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|edge| &edge.source == id)
            .map(|edge| edge.target.clone())
            .collect()
    }
}

impl Index<NodeIndex> for GraphModel {
    type Output = ConceptNode;
    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index.0]
    }
}

impl Index<EdgeIndex> for GraphModel {
    type Output = ConceptEdge;
    fn index(&self, index: EdgeIndex) -> &Self::Output {
        &self.edges[index.0]
    }
}
