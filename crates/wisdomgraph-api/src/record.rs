use crate::types::LevelDto;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use specta::Type;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Type)]
pub struct PositionDto {
    pub x: f64,
    pub y: f64,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Type)]
pub struct NodeRecord {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub position: Option<PositionDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Type)]
pub struct EdgeRecord {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// Canonical persisted/exported form of a learning map.
///
/// Field names are part of the export file format and must stay stable.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct MapRecord {
    pub topic: String,
    pub level: LevelDto,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    /// Always written on export; older hand-written files may omit it.
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
}
