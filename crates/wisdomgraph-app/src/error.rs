use crate::codec::CodecError;
use crate::provider::ProviderError;
use thiserror::Error;
use wisdomgraph_api::ApiError;
use wisdomgraph_core::NodeId;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Map generation failed: {0}")]
    GenerationFailed(String),
    #[error("Provider returned a malformed graph: {0}")]
    MalformedGraph(String),
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("Expanding {node} failed: {reason}")]
    ExpansionFailed { node: NodeId, reason: String },
    #[error("Node {0} is already being expanded")]
    ExpansionInProgress(NodeId),
    #[error("Session {0} was discarded")]
    SessionDiscarded(String),
}

impl CoordinatorError {
    pub(crate) fn expansion_failed(node: &NodeId, reason: impl Into<String>) -> Self {
        Self::ExpansionFailed {
            node: node.clone(),
            reason: reason.into(),
        }
    }

    pub(crate) fn from_provider(node: &NodeId, err: ProviderError) -> Self {
        Self::expansion_failed(node, err.to_string())
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        let message = err.to_string();
        match err {
            CoordinatorError::InvalidArgument(_) => ApiError::invalid_argument(message),
            CoordinatorError::NodeNotFound(_) => ApiError::not_found(message),
            CoordinatorError::ExpansionInProgress(_) | CoordinatorError::SessionDiscarded(_) => {
                ApiError::conflict(message)
            }
            CoordinatorError::GenerationFailed(_)
            | CoordinatorError::MalformedGraph(_)
            | CoordinatorError::ExpansionFailed { .. } => ApiError::upstream(message),
        }
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        ApiError::invalid_argument(err.to_string())
    }
}
