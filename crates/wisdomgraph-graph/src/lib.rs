pub mod graph;
pub mod layout;
pub mod map;

pub use graph::{EdgeIndex, GraphModel, NodeIndex};
pub use layout::{LayeredLayouter, Layout, LayoutConfig, LayoutConfigError, Layouter};
pub use map::LearningMap;
