use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use wisdomgraph_api::{
    ExpansionPayload, InitialMapPayload, PayloadError, parse_expansion_payload,
    parse_initial_payload,
};
use wisdomgraph_core::Level;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    Request(String),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error("Provider response unavailable at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Source of generated learning content. One call per coordinator
/// operation; implementations must not retry on their own.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn generate_initial(
        &self,
        topic: &str,
        level: Level,
    ) -> Result<InitialMapPayload, ProviderError>;

    async fn expand_node(
        &self,
        node_label: &str,
        topic: &str,
        level: Level,
    ) -> Result<ExpansionPayload, ProviderError>;
}

/// Serves canned provider responses from a directory.
///
/// `initial.json` answers every generation request and
/// `expand-<label-slug>.json` answers expansion of the node with that label.
/// Files may contain fenced JSON exactly as a language model would return it.
#[derive(Debug, Clone)]
pub struct FileContentProvider {
    dir: PathBuf,
}

impl FileContentProvider {
    pub const INITIAL_FILE: &'static str = "initial.json";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn expansion_file_name(node_label: &str) -> String {
        format!("expand-{}.json", slugify(node_label))
    }

    async fn read(&self, file_name: &str) -> Result<String, ProviderError> {
        let path = self.dir.join(file_name);
        tracing::debug!(path = %path.display(), "reading canned provider response");
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ProviderError::Io { path, source })
    }
}

#[async_trait]
impl ContentProvider for FileContentProvider {
    async fn generate_initial(
        &self,
        _topic: &str,
        _level: Level,
    ) -> Result<InitialMapPayload, ProviderError> {
        let text = self.read(Self::INITIAL_FILE).await?;
        Ok(parse_initial_payload(&text)?)
    }

    async fn expand_node(
        &self,
        node_label: &str,
        _topic: &str,
        _level: Level,
    ) -> Result<ExpansionPayload, ProviderError> {
        let text = self.read(&Self::expansion_file_name(node_label)).await?;
        Ok(parse_expansion_payload(&text)?)
    }
}

fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for ch in label.trim().chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expansion_file_name_slugs_label() {
        assert_eq!(
            FileContentProvider::expansion_file_name("Soil & Compost"),
            "expand-soil-compost.json"
        );
        assert_eq!(
            FileContentProvider::expansion_file_name("  Watering  "),
            "expand-watering.json"
        );
    }

    #[tokio::test]
    async fn test_reads_fenced_initial_payload() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(FileContentProvider::INITIAL_FILE),
            "```json\n{\"nodes\":[{\"id\":\"a\",\"label\":\"Gardening\"}],\"edges\":[]}\n```",
        )
        .unwrap();

        let provider = FileContentProvider::new(dir.path());
        let payload = provider
            .generate_initial("Gardening", Level::Beginner)
            .await
            .unwrap();
        assert_eq!(payload.nodes.len(), 1);
        assert_eq!(payload.nodes[0].label, "Gardening");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileContentProvider::new(dir.path());
        let err = provider
            .expand_node("Soil", "Gardening", Level::Beginner)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Io { .. }));
    }
}
