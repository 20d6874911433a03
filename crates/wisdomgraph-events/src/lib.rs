use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};
use wisdomgraph_core::{Level, NodeId};

pub mod telemetry;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    // Map lifecycle
    MapGenerated {
        session_id: String,
        topic: String,
        level: Level,
        node_count: usize,
        edge_count: usize,
    },
    MapImported {
        session_id: String,
        topic: String,
        node_count: usize,
        relaid_out: bool,
    },
    SessionDiscarded {
        session_id: String,
    },

    // Expansion
    ExpansionStarted {
        session_id: String,
        node_id: NodeId,
    },
    NodeExpanded {
        session_id: String,
        node_id: NodeId,
        added: Vec<NodeId>,
    },
    ExpansionFailed {
        session_id: String,
        node_id: NodeId,
        error: String,
    },

    // Notifications
    ShowInfo {
        message: String,
    },
    ShowError {
        message: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Drains whatever is queued without blocking.
    pub fn drain(&self) -> Vec<Event> {
        self.rx.try_iter().collect()
    }
}
