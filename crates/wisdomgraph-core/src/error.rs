use crate::{EdgeId, NodeId};
use thiserror::Error;

/// Integrity violations raised by the graph model. These indicate a bug in
/// whoever built the node/edge set and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Duplicate node id: {0}")]
    DuplicateId(NodeId),
    #[error("Duplicate edge id: {0}")]
    DuplicateEdgeId(EdgeId),
    #[error("Edge {edge} references unknown node {endpoint}")]
    UnknownEndpoint { edge: EdgeId, endpoint: NodeId },
}
