pub mod codec;
pub mod config;
mod error;
pub mod expansion;
pub mod generation;
pub mod ids;
pub mod provider;
pub mod session;

pub use codec::{CodecError, ExportImportCodec, ImportedMap};
pub use config::{AppConfig, ConfigError};
pub use error::CoordinatorError;
pub use expansion::{ExpansionCoordinator, ExpansionOutcome};
pub use generation::GraphGenerationCoordinator;
pub use provider::{ContentProvider, FileContentProvider, ProviderError};
pub use session::{MapSession, MapWatcher};

use chrono::Utc;
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::sync::Arc;
use wisdomgraph_api::{ApiError, MapRecord};
use wisdomgraph_core::{Level, NodeId};
use wisdomgraph_events::telemetry::{Command, CommandSpan};
use wisdomgraph_events::{Event, EventBus};
use wisdomgraph_graph::{LayoutConfig, LearningMap};
use wisdomgraph_storage::{MapStore, StoredMap};

fn no_map_error() -> ApiError {
    ApiError::invalid_argument("No map loaded. Generate or import one first.")
}

fn no_store_error() -> ApiError {
    ApiError::invalid_argument("No map store configured.")
}

/// Front-end-agnostic orchestrator for one explorer.
///
/// Holds the active [`MapSession`]; generating or importing a map replaces it
/// and discards the previous one, so expansions still running against the
/// old map are rejected instead of applied.
pub struct MapController {
    generation: GraphGenerationCoordinator,
    expansion: ExpansionCoordinator,
    codec: ExportImportCodec,
    events: EventBus,
    store: Option<Arc<dyn MapStore>>,
    current: Mutex<Option<Arc<MapSession>>>,
}

impl MapController {
    pub fn new(provider: Arc<dyn ContentProvider>, layout: LayoutConfig) -> Self {
        let events = EventBus::new();
        Self {
            generation: GraphGenerationCoordinator::new(provider.clone(), layout, events.clone()),
            expansion: ExpansionCoordinator::new(provider, layout, events.clone()),
            codec: ExportImportCodec::new(layout),
            events,
            store: None,
            current: Mutex::new(None),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn MapStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Subscribe to lifecycle events.
    ///
    /// The bus is unbounded and every operation publishes to it, so a
    /// long-lived front end must keep draining this receiver. One-shot callers
    /// that never read it just drop the queue with the controller.
    pub fn events(&self) -> Receiver<Event> {
        self.events.receiver()
    }

    pub fn session(&self) -> Option<Arc<MapSession>> {
        self.current.lock().clone()
    }

    fn require_session(&self) -> Result<Arc<MapSession>, ApiError> {
        self.session().ok_or_else(no_map_error)
    }

    fn require_store(&self) -> Result<&Arc<dyn MapStore>, ApiError> {
        self.store.as_ref().ok_or_else(no_store_error)
    }

    fn replace_session(&self, session: MapSession) -> Arc<MapSession> {
        let session = Arc::new(session);
        let previous = self.current.lock().replace(session.clone());
        if let Some(previous) = previous {
            if previous.discard() {
                self.events.publish(Event::SessionDiscarded {
                    session_id: previous.id().to_string(),
                });
            }
        }
        session
    }

    pub async fn generate(&self, topic: &str, level: Level) -> Result<Arc<MapSession>, ApiError> {
        let session = self.generation.generate(topic, level).await?;
        Ok(self.replace_session(session))
    }

    pub async fn expand(&self, node_id: &NodeId) -> Result<ExpansionOutcome, ApiError> {
        let session = self.require_session()?;
        Ok(self.expansion.expand(&session, node_id).await?)
    }

    pub fn export(&self) -> Result<MapRecord, ApiError> {
        let session = self.require_session()?;
        Ok(self.codec.export(&session.snapshot(), Utc::now()))
    }

    pub fn import(&self, record: &MapRecord) -> Result<Arc<MapSession>, ApiError> {
        let mut span = CommandSpan::new(Command::ImportMap)
            .topic(record.topic.trim())
            .start();

        let imported = match self.codec.import(record) {
            Ok(imported) => imported,
            Err(err) => {
                span.fail(&err);
                return Err(err.into());
            }
        };

        let node_count = imported.map.model.node_count();
        let topic = imported.map.topic().to_string();
        let session = self.replace_session(MapSession::new(imported.map));
        span.attach_session(session.id());
        span.succeed();
        self.events.publish(Event::MapImported {
            session_id: session.id().to_string(),
            topic,
            node_count,
            relaid_out: imported.relaid_out,
        });
        Ok(session)
    }

    /// Lays out the current map again with `layout`, discarding stored positions.
    pub fn relayout(&self, layout: &LayoutConfig) -> Result<Arc<LearningMap>, ApiError> {
        let session = self.require_session()?;
        let (snapshot, ()) = session.commit(|current| {
            let mut next = current.clone();
            next.relayout(layout);
            Ok((next, ()))
        })?;
        Ok(snapshot)
    }

    pub fn save(&self, owner: &str) -> Result<String, ApiError> {
        let record = self.export()?;
        let id = self.require_store()?.create(owner, &record)?;
        self.events.publish(Event::ShowInfo {
            message: format!("Map '{}' saved.", record.topic),
        });
        Ok(id)
    }

    pub fn list_saved(&self, owner: &str) -> Result<Vec<StoredMap>, ApiError> {
        Ok(self.require_store()?.list(owner)?)
    }

    /// Number of maps `owner` has saved; may exceed what `list_saved` returns.
    pub fn count_saved(&self, owner: &str) -> Result<usize, ApiError> {
        Ok(self.require_store()?.count(owner)?)
    }

    pub fn get_saved(&self, owner: &str, id: &str) -> Result<StoredMap, ApiError> {
        self.require_store()?
            .get(owner, id)?
            .ok_or_else(|| ApiError::not_found(format!("Learning map not found: {id}")))
    }

    /// Loads a saved map into a new session.
    pub fn open_saved(&self, owner: &str, id: &str) -> Result<Arc<MapSession>, ApiError> {
        let stored = self.get_saved(owner, id)?;
        self.import(&stored.record)
    }

    pub fn delete_saved(&self, owner: &str, id: &str) -> Result<(), ApiError> {
        Ok(self.require_store()?.delete(owner, id)?)
    }
}
