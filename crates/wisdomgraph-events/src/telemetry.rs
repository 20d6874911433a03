use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use uuid::Uuid;
use wisdomgraph_core::NodeId;

const TELEMETRY_TARGET: &str = "wisdomgraph::events::telemetry";

/// Map operations whose lifecycle is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    GenerateMap,
    ExpandNode,
    ImportMap,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GenerateMap => "generate_map",
            Self::ExpandNode => "expand_node",
            Self::ImportMap => "import_map",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One running map operation and what it acts on.
///
/// Starting a span logs `command_start`; consuming it with [`succeed`] or
/// [`fail`] logs the outcome with the elapsed time. Every line carries the
/// same correlation id, topic, session and node, so a whole expansion can be
/// followed in the log by grepping for any one of them.
///
/// [`succeed`]: CommandSpan::succeed
/// [`fail`]: CommandSpan::fail
#[derive(Debug)]
pub struct CommandSpan {
    command: Command,
    correlation_id: Uuid,
    topic: Option<String>,
    session_id: Option<String>,
    node_id: Option<NodeId>,
    started: Instant,
}

impl CommandSpan {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            correlation_id: Uuid::new_v4(),
            topic: None,
            session_id: None,
            node_id: None,
            started: Instant::now(),
        }
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn session(mut self, session_id: impl ToString) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    pub fn node(mut self, node_id: &NodeId) -> Self {
        self.node_id = Some(node_id.clone());
        self
    }

    /// Logs the start and resets the clock.
    pub fn start(mut self) -> Self {
        self.started = Instant::now();
        info!(
            target: TELEMETRY_TARGET,
            command = %self.command,
            correlation_id = %self.correlation_id,
            topic = self.topic.as_deref(),
            session_id = self.session_id.as_deref(),
            node_id = self.node_id.as_ref().map(NodeId::as_str),
            "command_start"
        );
        self
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Records the session once the operation has created one.
    pub fn attach_session(&mut self, session_id: impl ToString) {
        self.session_id = Some(session_id.to_string());
    }

    /// Debug line tied to this command, e.g. a provider request.
    pub fn context(&self, context: &str) {
        debug!(
            target: TELEMETRY_TARGET,
            command = %self.command,
            correlation_id = %self.correlation_id,
            session_id = self.session_id.as_deref(),
            node_id = self.node_id.as_ref().map(NodeId::as_str),
            context = %context,
            "command_context"
        );
    }

    pub fn succeed(self) -> Duration {
        let elapsed = self.started.elapsed();
        info!(
            target: TELEMETRY_TARGET,
            command = %self.command,
            correlation_id = %self.correlation_id,
            topic = self.topic.as_deref(),
            session_id = self.session_id.as_deref(),
            node_id = self.node_id.as_ref().map(NodeId::as_str),
            duration_ms = elapsed.as_millis() as u64,
            "command_success"
        );
        elapsed
    }

    pub fn fail(self, reason: &dyn fmt::Display) -> Duration {
        let elapsed = self.started.elapsed();
        error!(
            target: TELEMETRY_TARGET,
            command = %self.command,
            correlation_id = %self.correlation_id,
            topic = self.topic.as_deref(),
            session_id = self.session_id.as_deref(),
            node_id = self.node_id.as_ref().map(NodeId::as_str),
            duration_ms = elapsed.as_millis() as u64,
            error = %reason,
            "command_failure"
        );
        elapsed
    }
}
