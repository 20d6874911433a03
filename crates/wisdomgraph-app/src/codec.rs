use chrono::{DateTime, Utc};
use thiserror::Error;
use wisdomgraph_api::{EdgeRecord, MapRecord, NodeRecord, PositionDto};
use wisdomgraph_core::{ConceptEdge, ConceptNode, NodeId, Position};
use wisdomgraph_graph::{GraphModel, LayoutConfig, LearningMap};

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Invalid map record: {0}")]
    InvalidRecord(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::InvalidRecord(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ImportedMap {
    pub map: LearningMap,
    /// True when at least one node had no stored position and the layout ran.
    pub relaid_out: bool,
}

/// Converts maps to and from the canonical [`MapRecord`] export format.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportImportCodec {
    layout: LayoutConfig,
}

impl ExportImportCodec {
    pub fn new(layout: LayoutConfig) -> Self {
        Self { layout }
    }

    pub fn export(&self, map: &LearningMap, exported_at: DateTime<Utc>) -> MapRecord {
        MapRecord {
            topic: map.topic().to_string(),
            level: map.level().into(),
            nodes: map.model.nodes().iter().map(node_record).collect(),
            edges: map
                .model
                .edges()
                .iter()
                .map(|edge| EdgeRecord {
                    id: edge.id.to_string(),
                    source: edge.source.to_string(),
                    target: edge.target.to_string(),
                })
                .collect(),
            exported_at: Some(exported_at),
        }
    }

    /// Rebuilds a map from a record. Stored positions are kept as-is unless
    /// any node lacks one, in which case the whole graph is laid out.
    pub fn import(&self, record: &MapRecord) -> Result<ImportedMap, CodecError> {
        let topic = record.topic.trim();
        if topic.is_empty() {
            return Err(CodecError::InvalidRecord("topic is empty".to_string()));
        }

        let mut model = GraphModel::new();
        for node in &record.nodes {
            if node.id.trim().is_empty() {
                return Err(CodecError::InvalidRecord("node with empty id".to_string()));
            }
            if node.label.trim().is_empty() {
                return Err(CodecError::InvalidRecord(format!(
                    "node {} has an empty label",
                    node.id
                )));
            }
            let mut concept = ConceptNode::new(node.id.as_str(), node.label.as_str())
                .with_resources(node.resources.iter().cloned());
            concept.description = node.description.clone();
            concept.position = node.position.map(|p| Position::new(p.x, p.y));
            model
                .add_node(concept)
                .map_err(|e| CodecError::InvalidRecord(e.to_string()))?;
        }

        for edge in &record.edges {
            model
                .add_edge(ConceptEdge::new(
                    edge.id.as_str(),
                    NodeId::new(edge.source.as_str()),
                    NodeId::new(edge.target.as_str()),
                ))
                .map_err(|e| CodecError::InvalidRecord(e.to_string()))?;
        }

        let mut map = LearningMap::with_model(topic, record.level.into(), model);
        let relaid_out = !map.model.is_fully_positioned();
        if relaid_out {
            tracing::debug!(topic = %topic, "imported map lacks positions, running layout");
            map.relayout(&self.layout);
        }
        Ok(ImportedMap { map, relaid_out })
    }
}

fn node_record(node: &ConceptNode) -> NodeRecord {
    NodeRecord {
        id: node.id.to_string(),
        label: node.label.clone(),
        description: node.description.clone(),
        resources: node.resources.clone(),
        position: node.position.map(|p| PositionDto { x: p.x, y: p.y }),
    }
}

pub fn to_json_pretty(record: &MapRecord) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(record)?)
}

pub fn from_json(text: &str) -> Result<MapRecord, CodecError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wisdomgraph_api::LevelDto;
    use wisdomgraph_core::Level;

    fn laid_out_map() -> LearningMap {
        let mut map = LearningMap::new("Gardening", Level::Intermediate);
        let mut root = ConceptNode::new("root", "Gardening").with_resources(["RHS guide"]);
        root.description = Some("Growing things".to_string());
        map.model.add_node(root).unwrap();
        map.model.add_node(ConceptNode::new("soil", "Soil")).unwrap();
        map.model
            .add_edge(ConceptEdge::new(
                "e-root-soil",
                NodeId::from("root"),
                NodeId::from("soil"),
            ))
            .unwrap();
        map.relayout(&LayoutConfig::default());
        map
    }

    #[test]
    fn test_round_trip_preserves_nodes_edges_and_positions() {
        let codec = ExportImportCodec::default();
        let map = laid_out_map();
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();

        let record = codec.export(&map, at);
        assert_eq!(record.level, LevelDto::Intermediate);
        assert_eq!(record.exported_at, Some(at));

        let text = to_json_pretty(&record).unwrap();
        let imported = codec.import(&from_json(&text).unwrap()).unwrap();

        assert!(!imported.relaid_out);
        assert_eq!(imported.map.topic(), "Gardening");
        assert_eq!(imported.map.level(), Level::Intermediate);
        assert_eq!(imported.map.model.nodes(), map.model.nodes());
        assert_eq!(imported.map.model.edges(), map.model.edges());
    }

    #[test]
    fn test_fractional_positions_survive_json_round_trip() {
        for k in 0..50 {
            let config = LayoutConfig {
                node_width: 100.0 + f64::from(k) * 0.37,
                node_height: 31.7,
                node_spacing: 13.3,
                rank_spacing: 47.9,
                ..LayoutConfig::default()
            };
            let mut map = LearningMap::new("Gardening", Level::Beginner);
            map.model.add_node(ConceptNode::new("root", "Gardening")).unwrap();
            for child in 0..9 {
                let id = format!("c{child}");
                map.model.add_node(ConceptNode::new(id.as_str(), id.as_str())).unwrap();
                map.model
                    .add_edge(ConceptEdge::new(
                        format!("e-root-{id}"),
                        NodeId::from("root"),
                        NodeId::new(id),
                    ))
                    .unwrap();
            }
            map.relayout(&config);

            let codec = ExportImportCodec::new(config);
            let text = to_json_pretty(&codec.export(&map, Utc::now())).unwrap();
            let imported = codec.import(&from_json(&text).unwrap()).unwrap();

            assert!(!imported.relaid_out);
            for (original, restored) in map.model.nodes().iter().zip(imported.map.model.nodes()) {
                assert_eq!(
                    original.position, restored.position,
                    "node {} drifted with node_width {}",
                    original.id, config.node_width
                );
            }
        }
    }

    #[test]
    fn test_import_lays_out_when_positions_missing() {
        let codec = ExportImportCodec::default();
        let mut record = codec.export(&laid_out_map(), Utc::now());
        record.nodes[1].position = None;

        let imported = codec.import(&record).unwrap();
        assert!(imported.relaid_out);
        assert!(imported.map.model.is_fully_positioned());
    }

    #[test]
    fn test_import_rejects_dangling_edge() {
        let codec = ExportImportCodec::default();
        let mut record = codec.export(&laid_out_map(), Utc::now());
        record.edges[0].target = "missing".to_string();

        assert!(matches!(
            codec.import(&record),
            Err(CodecError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_import_rejects_duplicate_ids() {
        let codec = ExportImportCodec::default();
        let mut record = codec.export(&laid_out_map(), Utc::now());
        record.nodes[1].id = "root".to_string();

        assert!(matches!(
            codec.import(&record),
            Err(CodecError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_missing_fields() {
        assert!(matches!(
            from_json(r#"{"topic":"Gardening","level":"Beginner","nodes":[]}"#),
            Err(CodecError::InvalidRecord(_))
        ));
        assert!(matches!(from_json("not json"), Err(CodecError::InvalidRecord(_))));
    }
}
