use serde::{Deserialize, Serialize};
use specta::Type;
use wisdomgraph_core as core;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
pub enum LevelDto {
    Beginner,
    Intermediate,
    Advanced,
}

impl From<core::Level> for LevelDto {
    fn from(value: core::Level) -> Self {
        match value {
            core::Level::Beginner => Self::Beginner,
            core::Level::Intermediate => Self::Intermediate,
            core::Level::Advanced => Self::Advanced,
        }
    }
}

impl From<LevelDto> for core::Level {
    fn from(value: LevelDto) -> Self {
        match value {
            LevelDto::Beginner => Self::Beginner,
            LevelDto::Intermediate => Self::Intermediate,
            LevelDto::Advanced => Self::Advanced,
        }
    }
}
