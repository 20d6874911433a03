use serde::{Deserialize, Serialize};
use specta::Type;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Type)]
pub struct ProviderNode {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub resources: Vec<String>,
}

/// Provider edges carry no id; one is synthesized when the graph is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Type)]
pub struct ProviderEdge {
    pub from: String,
    pub to: String,
}

/// Response to an initial map request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
pub struct InitialMapPayload {
    pub nodes: Vec<ProviderNode>,
    #[serde(default)]
    pub edges: Vec<ProviderEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Type)]
pub struct Subtopic {
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub resources: Vec<String>,
}

/// Response to a node expansion request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
pub struct ExpansionPayload {
    #[serde(default)]
    pub subtopics: Vec<Subtopic>,
}

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Provider response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Removes a markdown code fence that language models like to wrap JSON in.
///
/// "```json\n{...}\n```" and "```\n{...}" both reduce to "{...}"; text that
/// does not start with a fence is only trimmed.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let lines: Vec<&str> = trimmed.lines().collect();
    let body = match lines.split_first() {
        Some((_, rest)) if rest.last().is_some_and(|last| last.trim() == "```") => {
            &rest[..rest.len() - 1]
        }
        Some((_, rest)) => rest,
        None => &[][..],
    };

    body.join("\n")
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

pub fn parse_initial_payload(text: &str) -> Result<InitialMapPayload, PayloadError> {
    Ok(serde_json::from_str(&strip_code_fence(text))?)
}

pub fn parse_expansion_payload(text: &str) -> Result<ExpansionPayload, PayloadError> {
    Ok(serde_json::from_str(&strip_code_fence(text))?)
}
