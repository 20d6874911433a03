use crate::error::CoordinatorError;
use crate::ids::edge_id_for;
use crate::provider::ContentProvider;
use crate::session::MapSession;
use std::sync::Arc;
use wisdomgraph_api::InitialMapPayload;
use wisdomgraph_core::{ConceptEdge, ConceptNode, Level, NodeId};
use wisdomgraph_events::telemetry::{Command, CommandSpan};
use wisdomgraph_events::{Event, EventBus};
use wisdomgraph_graph::{GraphModel, LayoutConfig, LearningMap};

/// Turns a `(topic, level)` request into a fresh, laid-out map session.
pub struct GraphGenerationCoordinator {
    provider: Arc<dyn ContentProvider>,
    layout: LayoutConfig,
    events: EventBus,
}

impl GraphGenerationCoordinator {
    pub fn new(provider: Arc<dyn ContentProvider>, layout: LayoutConfig, events: EventBus) -> Self {
        Self {
            provider,
            layout,
            events,
        }
    }

    pub async fn generate(&self, topic: &str, level: Level) -> Result<MapSession, CoordinatorError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(CoordinatorError::InvalidArgument(
                "topic must not be empty".to_string(),
            ));
        }

        let mut span = CommandSpan::new(Command::GenerateMap).topic(topic).start();

        match self.generate_inner(topic, level).await {
            Ok(session) => {
                span.attach_session(session.id());
                span.succeed();
                let snapshot = session.snapshot();
                self.events.publish(Event::MapGenerated {
                    session_id: session.id().to_string(),
                    topic: topic.to_string(),
                    level,
                    node_count: snapshot.model.node_count(),
                    edge_count: snapshot.model.edge_count(),
                });
                Ok(session)
            }
            Err(err) => {
                span.fail(&err);
                self.events.publish(Event::ShowError {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn generate_inner(&self, topic: &str, level: Level) -> Result<MapSession, CoordinatorError> {
        let payload = self
            .provider
            .generate_initial(topic, level)
            .await
            .map_err(|e| CoordinatorError::GenerationFailed(e.to_string()))?;

        let mut map = build_map(topic, level, &payload)?;
        let layout = map.relayout(&self.layout);
        tracing::info!(
            topic = %topic,
            level = %level,
            nodes = map.model.node_count(),
            edges = map.model.edge_count(),
            ranks = layout.layers().len(),
            "learning map generated"
        );
        Ok(MapSession::new(map))
    }
}

/// Validates a provider payload and builds the unpositioned map from it.
///
/// Either the whole payload is accepted or nothing is built.
pub fn build_map(
    topic: &str,
    level: Level,
    payload: &InitialMapPayload,
) -> Result<LearningMap, CoordinatorError> {
    if payload.nodes.is_empty() {
        return Err(CoordinatorError::GenerationFailed(
            "provider returned no nodes".to_string(),
        ));
    }

    let mut model = GraphModel::new();
    for node in &payload.nodes {
        let id = node.id.trim();
        let label = node.label.trim();
        if id.is_empty() {
            return Err(CoordinatorError::MalformedGraph(format!(
                "node labelled '{label}' has an empty id"
            )));
        }
        if label.is_empty() {
            return Err(CoordinatorError::MalformedGraph(format!(
                "node {id} has an empty label"
            )));
        }

        let mut concept = ConceptNode::new(id, label).with_resources(node.resources.iter().cloned());
        concept.description = node.description.clone();
        model
            .add_node(concept)
            .map_err(|e| CoordinatorError::MalformedGraph(e.to_string()))?;
    }

    for edge in &payload.edges {
        let source = NodeId::new(edge.from.trim());
        let target = NodeId::new(edge.to.trim());
        let id = edge_id_for(source.as_str(), target.as_str(), |candidate| {
            model.contains_edge(&candidate.into())
        });
        model
            .add_edge(ConceptEdge::new(id, source, target))
            .map_err(|e| CoordinatorError::MalformedGraph(e.to_string()))?;
    }

    Ok(LearningMap::with_model(topic, level, model))
}
