//! Contract for the remote prompt collection.

use async_trait::async_trait;

use crate::domain::{Prompt, RemoteConfig, Result};

/// Where the prompts live remotely, after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerResolution {
    /// Database id to query and write into.
    pub container_id: String,
    /// True when the database was just created under the configured page.
    /// The caller must persist `container_id`.
    pub provisioned: bool,
}

/// Result of reading the whole remote collection.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub prompts: Vec<Prompt>,
    /// Remote documents that could not be converted and were skipped.
    pub dropped: usize,
}

/// A remote document store holding prompts.
///
/// Implementations perform exactly one attempt per call; retry policy
/// belongs to the caller.
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    /// Lightweight read against the configured container. Never errors.
    async fn test_connection(&self, config: &RemoteConfig) -> bool;

    /// Resolve the configured id to a database, creating one under it when
    /// the id refers to a plain page.
    async fn resolve_container(&self, config: &RemoteConfig) -> Result<ContainerResolution>;

    /// Read every document in `config.page_id`, which must be a resolved
    /// container.
    async fn fetch_all(&self, config: &RemoteConfig) -> Result<FetchOutcome>;

    /// Update the document when the prompt id is remote-shaped, create one
    /// otherwise. Returns the stored document when the API echoes one back.
    async fn create_or_update(&self, config: &RemoteConfig, prompt: &Prompt)
        -> Result<Option<Prompt>>;

    /// Soft-delete a document. Archiving an archived document succeeds.
    async fn archive(&self, config: &RemoteConfig, id: &str) -> Result<()>;
}
