use crate::error::CoordinatorError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use uuid::Uuid;
use wisdomgraph_graph::LearningMap;

/// Receiver that yields a new snapshot after every committed mutation.
pub type MapWatcher = watch::Receiver<Arc<LearningMap>>;

/// Identity of one learning map while it is being explored.
///
/// The current graph is published as immutable snapshots, so readers see the
/// map either before or after a commit and never halfway through a merge.
/// Once discarded, a session rejects every further commit.
#[derive(Debug)]
pub struct MapSession {
    id: Uuid,
    sender: watch::Sender<Arc<LearningMap>>,
    discarded: AtomicBool,
}

impl MapSession {
    pub fn new(map: LearningMap) -> Self {
        let (sender, _rx) = watch::channel(Arc::new(map));
        Self {
            id: Uuid::new_v4(),
            sender,
            discarded: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn snapshot(&self) -> Arc<LearningMap> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> MapWatcher {
        self.sender.subscribe()
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded.load(Ordering::Acquire)
    }

    /// Returns `false` if the session was already discarded.
    pub fn discard(&self) -> bool {
        let first = !self.discarded.swap(true, Ordering::AcqRel);
        if first {
            tracing::info!(session_id = %self.id, "map session discarded");
        }
        first
    }

    pub(crate) fn ensure_live(&self) -> Result<(), CoordinatorError> {
        if self.is_discarded() {
            return Err(CoordinatorError::SessionDiscarded(self.id.to_string()));
        }
        Ok(())
    }

    /// Builds the next snapshot from the latest one and publishes it.
    ///
    /// `apply` runs while the channel is locked, so concurrent commits are
    /// serialized and each one starts from its predecessor's result. Nothing
    /// is published when `apply` fails.
    pub(crate) fn commit<T>(
        &self,
        apply: impl FnOnce(&LearningMap) -> Result<(LearningMap, T), CoordinatorError>,
    ) -> Result<(Arc<LearningMap>, T), CoordinatorError> {
        let mut outcome = None;
        self.sender.send_if_modified(|current| {
            let result = match self.ensure_live() {
                Ok(()) => apply(&**current),
                Err(err) => Err(err),
            };
            match result {
                Ok((next, value)) => {
                    let next = Arc::new(next);
                    *current = next.clone();
                    outcome = Some(Ok((next, value)));
                    true
                }
                Err(err) => {
                    outcome = Some(Err(err));
                    false
                }
            }
        });
        outcome.unwrap_or_else(|| Err(CoordinatorError::SessionDiscarded(self.id.to_string())))
    }
}
