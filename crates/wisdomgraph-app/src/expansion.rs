use crate::error::CoordinatorError;
use crate::ids::{NodeIdGenerator, edge_id_for};
use crate::provider::ContentProvider;
use crate::session::MapSession;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;
use wisdomgraph_api::Subtopic;
use wisdomgraph_core::{ConceptEdge, ConceptNode, NodeId};
use wisdomgraph_events::telemetry::{Command, CommandSpan};
use wisdomgraph_events::{Event, EventBus};
use wisdomgraph_graph::{LayoutConfig, LearningMap};

#[derive(Debug, Clone)]
pub struct ExpansionOutcome {
    /// The map as published after the merge and re-layout.
    pub snapshot: Arc<LearningMap>,
    /// Ids of the created nodes, in provider order.
    pub added: Vec<NodeId>,
}

type InFlightKey = (Uuid, NodeId);

/// Marks one node of one session as being expanded until dropped.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<InFlightKey>>,
    key: InFlightKey,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<InFlightKey>>, key: InFlightKey) -> Option<Self> {
        if !in_flight.lock().insert(key.clone()) {
            return None;
        }
        Some(Self { in_flight, key })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

/// Attaches provider-generated subtopics under an existing node.
///
/// Expansions of different nodes may overlap; each merges into whatever
/// snapshot is current when its provider call returns, then lays out the
/// whole graph again.
pub struct ExpansionCoordinator {
    provider: Arc<dyn ContentProvider>,
    layout: LayoutConfig,
    events: EventBus,
    ids: NodeIdGenerator,
    in_flight: Mutex<HashSet<InFlightKey>>,
}

impl ExpansionCoordinator {
    pub fn new(provider: Arc<dyn ContentProvider>, layout: LayoutConfig, events: EventBus) -> Self {
        Self {
            provider,
            layout,
            events,
            ids: NodeIdGenerator::new(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_expanding(&self, session: &MapSession, node: &NodeId) -> bool {
        self.in_flight
            .lock()
            .contains(&(session.id(), node.clone()))
    }

    pub async fn expand(
        &self,
        session: &MapSession,
        node_id: &NodeId,
    ) -> Result<ExpansionOutcome, CoordinatorError> {
        session.ensure_live()?;
        let snapshot = session.snapshot();
        let Some(node) = snapshot.model.get_node(node_id) else {
            return Err(CoordinatorError::NodeNotFound(node_id.clone()));
        };

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, (session.id(), node_id.clone()))
        else {
            return Err(CoordinatorError::ExpansionInProgress(node_id.clone()));
        };

        let session_id = session.id().to_string();
        let span = CommandSpan::new(Command::ExpandNode)
            .topic(snapshot.topic())
            .session(&session_id)
            .node(node_id)
            .start();
        span.context(&format!("expanding label {:?}", node.label));
        self.events.publish(Event::ExpansionStarted {
            session_id: session_id.clone(),
            node_id: node_id.clone(),
        });

        let result = self
            .request_and_merge(session, node_id, &node.label, &snapshot)
            .await;

        match &result {
            Ok(outcome) => {
                span.succeed();
                self.events.publish(Event::NodeExpanded {
                    session_id,
                    node_id: node_id.clone(),
                    added: outcome.added.clone(),
                });
            }
            Err(err) => {
                span.fail(err);
                self.events.publish(Event::ExpansionFailed {
                    session_id,
                    node_id: node_id.clone(),
                    error: err.to_string(),
                });
            }
        }
        result
    }

    async fn request_and_merge(
        &self,
        session: &MapSession,
        node_id: &NodeId,
        label: &str,
        requested_from: &LearningMap,
    ) -> Result<ExpansionOutcome, CoordinatorError> {
        let payload = self
            .provider
            .expand_node(label, requested_from.topic(), requested_from.level())
            .await
            .map_err(|e| CoordinatorError::from_provider(node_id, e))?;

        let (snapshot, added) = session.commit(|current| {
            merge_subtopics(current, node_id, &payload.subtopics, &self.ids, &self.layout)
        })?;

        tracing::info!(
            session_id = %session.id(),
            node_id = %node_id,
            added = added.len(),
            total_nodes = snapshot.model.node_count(),
            "node expanded"
        );
        Ok(ExpansionOutcome { snapshot, added })
    }
}

/// Builds the map that results from attaching `subtopics` under `parent`,
/// with every node laid out again. `map` itself is never touched, so a
/// failure leaves the caller's graph exactly as it was.
pub fn merge_subtopics(
    map: &LearningMap,
    parent: &NodeId,
    subtopics: &[Subtopic],
    ids: &NodeIdGenerator,
    layout: &LayoutConfig,
) -> Result<(LearningMap, Vec<NodeId>), CoordinatorError> {
    if !map.model.contains_node(parent) {
        return Err(CoordinatorError::NodeNotFound(parent.clone()));
    }
    if subtopics.is_empty() {
        return Err(CoordinatorError::expansion_failed(
            parent,
            "provider returned no subtopics",
        ));
    }
    if let Some(position) = subtopics.iter().position(|s| s.label.trim().is_empty()) {
        return Err(CoordinatorError::expansion_failed(
            parent,
            format!("subtopic {position} has an empty label"),
        ));
    }

    let mut next = map.clone();
    let mut added = Vec::with_capacity(subtopics.len());
    for subtopic in subtopics {
        let id = ids.next_id(parent, |candidate| {
            next.model.contains_node(&candidate.into())
        });
        let mut node = ConceptNode::new(id.as_str(), subtopic.label.trim())
            .with_resources(subtopic.resources.iter().cloned());
        node.description = subtopic.description.clone();
        next.model
            .add_node(node)
            .map_err(|e| CoordinatorError::expansion_failed(parent, e.to_string()))?;

        let edge_id = edge_id_for(parent.as_str(), id.as_str(), |candidate| {
            next.model.contains_edge(&candidate.into())
        });
        next.model
            .add_edge(ConceptEdge::new(edge_id, parent.clone(), id.clone()))
            .map_err(|e| CoordinatorError::expansion_failed(parent, e.to_string()))?;
        added.push(id);
    }

    next.relayout(layout);
    Ok((next, added))
}
