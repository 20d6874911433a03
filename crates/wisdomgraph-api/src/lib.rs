mod errors;
mod provider;
mod record;
mod types;

pub use errors::ApiError;
pub use provider::{
    ExpansionPayload, InitialMapPayload, PayloadError, ProviderEdge, ProviderNode, Subtopic,
    parse_expansion_payload, parse_initial_payload, strip_code_fence,
};
pub use record::{EdgeRecord, MapRecord, NodeRecord, PositionDto};
pub use types::LevelDto;
