use crate::graph::GraphModel;
use crate::layout::{LayeredLayouter, Layout, LayoutConfig, Layouter};
use wisdomgraph_core::Level;

/// A learning map: one graph bound to the topic and level it was generated
/// for. Topic and level never change; they are the generation context for
/// every later expansion.
#[derive(Debug, Clone)]
pub struct LearningMap {
    topic: String,
    level: Level,
    pub model: GraphModel,
}

impl LearningMap {
    pub fn new(topic: impl Into<String>, level: Level) -> Self {
        Self::with_model(topic, level, GraphModel::new())
    }

    pub fn with_model(topic: impl Into<String>, level: Level, model: GraphModel) -> Self {
        Self {
            topic: topic.into(),
            level,
            model,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Lays out the whole graph and stores the positions on its nodes.
    pub fn relayout(&mut self, config: &LayoutConfig) -> Layout {
        let layout = LayeredLayouter::new(*config).execute(&self.model);
        layout.apply_to(&mut self.model);
        layout
    }
}
