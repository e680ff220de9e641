//! Prompt management use cases.
//!
//! Everything a front end does besides syncing: create, edit, delete,
//! capture selected text, search, import/export and backend settings.

use std::sync::Arc;

use crate::domain::{
    AppError, AppState, NewPrompt, Prompt, PromptPatch, RemoteConfig, Result, StorageBackend,
};
use crate::infrastructure::{PromptStore, RemoteCollection};

use super::search::search;
use super::transfer::{export_prompts, merge_import, parse_import};

/// Use cases over the local collection.
pub struct PromptService {
    store: PromptStore,
    remote: Arc<dyn RemoteCollection>,
}

impl PromptService {
    #[must_use]
    pub fn new(store: PromptStore, remote: Arc<dyn RemoteCollection>) -> Self {
        Self { store, remote }
    }

    /// Current prompts, backend and tags.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn state(&self) -> Result<AppState> {
        self.store.load_state().await
    }

    /// All prompts in stored order.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn list(&self) -> Result<Vec<Prompt>> {
        Ok(self.store.load_prompts().await?.0)
    }

    /// Find a prompt by exact id or unique id prefix.
    ///
    /// # Errors
    /// Returns `NotFound` when nothing matches and a validation error when a
    /// prefix is ambiguous.
    pub async fn get(&self, id: &str) -> Result<Prompt> {
        let prompts = self.list().await?;
        let index = find_index(&prompts, id)?;
        Ok(prompts[index].clone())
    }

    /// Create and store a prompt.
    ///
    /// # Errors
    /// Returns a validation error for bad input or a storage error.
    pub async fn add(&self, input: NewPrompt) -> Result<Prompt> {
        let prompt = Prompt::create(input)?;
        let (mut prompts, backend) = self.store.load_prompts().await?;
        prompts.push(prompt.clone());
        self.store.save_prompts(&prompts, backend).await?;

        tracing::info!(id = %prompt.id, "Prompt added");
        Ok(prompt)
    }

    /// Store text captured from a selection, e.g. a context-menu action.
    ///
    /// # Errors
    /// Returns a validation error for empty text or a storage error.
    pub async fn capture(
        &self,
        selection: &str,
        title: Option<String>,
        tags: Option<Vec<String>>,
    ) -> Result<Prompt> {
        self.add(NewPrompt {
            title,
            content: selection.to_string(),
            tags,
        })
        .await
    }

    /// Apply an edit to a stored prompt.
    ///
    /// # Errors
    /// Returns `NotFound`, a validation error, or a storage error.
    pub async fn edit(&self, id: &str, patch: PromptPatch) -> Result<Prompt> {
        if patch.is_empty() {
            return Err(AppError::validation("Nothing to update"));
        }

        let (mut prompts, backend) = self.store.load_prompts().await?;
        let index = find_index(&prompts, id)?;
        prompts[index].apply(patch)?;
        self.store.save_prompts(&prompts, backend).await?;

        let updated = prompts.swap_remove(index);
        tracing::info!(id = %updated.id, "Prompt updated");
        Ok(updated)
    }

    /// Delete a prompt. With the Notion backend active, a prompt already
    /// stored remotely is archived there first; if that fails nothing is
    /// deleted.
    ///
    /// # Errors
    /// Returns `NotFound`, a config or remote error, or a storage error.
    pub async fn delete(&self, id: &str) -> Result<Prompt> {
        let (mut prompts, backend) = self.store.load_prompts().await?;
        let index = find_index(&prompts, id)?;

        if backend == StorageBackend::Notion && prompts[index].is_remote() {
            let config = self
                .store
                .remote_config()
                .await?
                .ok_or_else(AppError::not_configured)?;
            self.remote.archive(&config, &prompts[index].id).await?;
            tracing::debug!(id = %prompts[index].id, "Archived in Notion");
        }

        let removed = prompts.remove(index);
        self.store.save_prompts(&prompts, backend).await?;

        tracing::info!(id = %removed.id, "Prompt deleted");
        Ok(removed)
    }

    /// Search stored prompts.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn search(&self, query: &str, tags: &[String]) -> Result<Vec<Prompt>> {
        Ok(search(&self.list().await?, query, tags))
    }

    /// Known tags, falling back to the defaults.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn tags(&self) -> Result<Vec<String>> {
        self.store.all_tags().await
    }

    /// Record the active backend. Does not move any data.
    ///
    /// # Errors
    /// Returns a config error when switching to Notion without credentials.
    pub async fn switch_backend(&self, backend: StorageBackend) -> Result<()> {
        if backend == StorageBackend::Notion && self.store.remote_config().await?.is_none() {
            return Err(AppError::not_configured());
        }
        self.store.set_backend(backend).await?;
        tracing::info!(%backend, "Backend switched");
        Ok(())
    }

    /// Check and store Notion credentials.
    ///
    /// # Errors
    /// Returns a remote error when the connection test fails.
    pub async fn configure_remote(&self, config: RemoteConfig) -> Result<()> {
        if !self.remote.test_connection(&config).await {
            return Err(AppError::Remote {
                message: "Could not connect to Notion with the provided credentials".into(),
                status: None,
            });
        }
        self.store.save_remote_config(&config).await?;
        tracing::info!(page = %config.page_id, "Notion connected");
        Ok(())
    }

    /// Forget Notion credentials and fall back to local storage.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn disconnect_remote(&self) -> Result<()> {
        self.store.clear_remote_config().await?;
        self.store.set_backend(StorageBackend::Local).await
    }

    /// Serialize the whole collection.
    ///
    /// # Errors
    /// Returns error if the store or serialization fails.
    pub async fn export_json(&self) -> Result<String> {
        export_prompts(&self.list().await?)
    }

    /// Import a serialized collection, overwriting prompts with the same id,
    /// and store the result under the active backend.
    ///
    /// # Errors
    /// Returns a validation error for a malformed payload (nothing is
    /// applied) or a storage error.
    pub async fn import_from_str(&self, text: &str) -> Result<Vec<Prompt>> {
        let imported = parse_import(text)?;
        let count = imported.len();

        let (current, backend) = self.store.load_prompts().await?;
        let merged = merge_import(current, imported);
        self.store.save_prompts(&merged, backend).await?;

        tracing::info!(imported = count, total = merged.len(), "Prompts imported");
        Ok(merged)
    }
}

fn find_index(prompts: &[Prompt], id: &str) -> Result<usize> {
    if let Some(index) = prompts.iter().position(|p| p.id == id) {
        return Ok(index);
    }

    let mut matches = prompts
        .iter()
        .enumerate()
        .filter(|(_, p)| !id.is_empty() && p.id.starts_with(id));

    match (matches.next(), matches.next()) {
        (Some((index, _)), None) => Ok(index),
        (Some(_), Some(_)) => Err(AppError::validation(format!(
            "Id prefix '{id}' matches more than one prompt"
        ))),
        (None, _) => Err(AppError::NotFound { id: id.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::sync_service::tests::{prompt, Call, FakeRemote};
    use crate::infrastructure::record_store::memory::MemoryRecordStore;

    const REMOTE_ID: &str = "1f3a9c2e7b4d4e1a9c3b2d5e6f7a8b9c";

    fn service(remote: FakeRemote) -> (PromptStore, Arc<FakeRemote>, PromptService) {
        let store = PromptStore::new(Arc::new(MemoryRecordStore::new()));
        let remote = Arc::new(remote);
        let service = PromptService::new(store.clone(), remote.clone());
        (store, remote, service)
    }

    fn config() -> RemoteConfig {
        RemoteConfig {
            api_key: "secret".into(),
            page_id: "page".into(),
        }
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let (store, _, service) = service(FakeRemote::default());

        let added = service
            .add(NewPrompt {
                title: None,
                content: "Explain like I'm five".into(),
                tags: Some(vec!["Education & Learning".into()]),
            })
            .await
            .unwrap();

        assert_eq!(added.title, "Untitled Prompt");
        assert_eq!(service.list().await.unwrap(), vec![added]);
        assert_eq!(
            store.all_tags().await.unwrap(),
            vec!["Education & Learning".to_string()]
        );
    }

    #[tokio::test]
    async fn test_add_rejects_empty_content() {
        let (_, _, service) = service(FakeRemote::default());

        let err = service
            .add(NewPrompt {
                content: "   ".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_capture_selection() {
        let (_, _, service) = service(FakeRemote::default());

        let captured = service
            .capture("  selected words  ", Some("From page".into()), None)
            .await
            .unwrap();

        assert_eq!(captured.content, "selected words");
        assert_eq!(captured.title, "From page");
    }

    #[tokio::test]
    async fn test_edit_by_prefix_refreshes_timestamp() {
        let (store, _, service) = service(FakeRemote::default());
        store
            .save_prompts(&[prompt("abcdef123456", "old", 5)], StorageBackend::Local)
            .await
            .unwrap();

        let edited = service
            .edit(
                "abcd",
                PromptPatch {
                    content: Some("new".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(edited.content, "new");
        assert!(edited.updated_at > 5);
        assert_eq!(service.get("abcdef123456").await.unwrap(), edited);
    }

    #[tokio::test]
    async fn test_lookup_errors() {
        let (store, _, service) = service(FakeRemote::default());
        store
            .save_prompts(
                &[prompt("abc1", "a", 1), prompt("abc2", "b", 1)],
                StorageBackend::Local,
            )
            .await
            .unwrap();

        assert!(matches!(
            service.get("zzz").await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            service.get("abc").await,
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            service.edit("abc1", PromptPatch::default()).await,
            Err(AppError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_local_makes_no_remote_call() {
        let (store, remote, service) = service(FakeRemote::default());
        store
            .save_prompts(&[prompt(REMOTE_ID, "a", 1)], StorageBackend::Local)
            .await
            .unwrap();

        service.delete(REMOTE_ID).await.unwrap();

        assert!(service.list().await.unwrap().is_empty());
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_with_notion_backend_archives_first() {
        let (store, remote, service) =
            service(FakeRemote::with_documents(vec![prompt(REMOTE_ID, "a", 1)]));
        store.save_remote_config(&config()).await.unwrap();
        store
            .save_prompts(
                &[prompt(REMOTE_ID, "a", 1), prompt("local1", "b", 1)],
                StorageBackend::Notion,
            )
            .await
            .unwrap();

        service.delete(REMOTE_ID).await.unwrap();
        service.delete("local1").await.unwrap();

        assert_eq!(remote.calls(), vec![Call::Archive(REMOTE_ID.to_string())]);
        assert!(remote.documents.lock().unwrap().is_empty());
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_with_notion_backend_requires_config() {
        let (store, _, service) = service(FakeRemote::default());
        store
            .save_prompts(&[prompt(REMOTE_ID, "a", 1)], StorageBackend::Notion)
            .await
            .unwrap();

        let err = service.delete(REMOTE_ID).await.unwrap_err();

        assert!(matches!(err, AppError::Config { .. }));
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_requires_working_credentials() {
        let (store, _, service) = service(FakeRemote::default());
        assert!(service.configure_remote(config()).await.is_err());
        assert!(store.remote_config().await.unwrap().is_none());

        let (store, remote, service) = service_reachable();
        service.configure_remote(config()).await.unwrap();
        assert_eq!(store.remote_config().await.unwrap(), Some(config()));
        assert_eq!(remote.calls(), vec![Call::Test]);
    }

    fn service_reachable() -> (PromptStore, Arc<FakeRemote>, PromptService) {
        service(FakeRemote::with_documents(vec![]))
    }

    #[tokio::test]
    async fn test_switch_backend_is_metadata_only() {
        let (store, remote, service) = service_reachable();
        store
            .save_prompts(&[prompt("a", "a", 1)], StorageBackend::Local)
            .await
            .unwrap();

        assert!(matches!(
            service.switch_backend(StorageBackend::Notion).await,
            Err(AppError::Config { .. })
        ));

        store.save_remote_config(&config()).await.unwrap();
        service.switch_backend(StorageBackend::Notion).await.unwrap();

        let state = service.state().await.unwrap();
        assert_eq!(state.backend, StorageBackend::Notion);
        assert_eq!(state.prompts.len(), 1);
        assert!(remote.calls().is_empty());

        service.disconnect_remote().await.unwrap();
        assert_eq!(service.state().await.unwrap().backend, StorageBackend::Local);
        assert!(store.remote_config().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_import_keeps_active_backend() {
        let (store, _, service) = service(FakeRemote::default());
        store
            .save_prompts(&[prompt("x", "old", 9_999_999)], StorageBackend::Notion)
            .await
            .unwrap();

        let merged = service
            .import_from_str(r#"[{"id": "x", "content": "new", "updatedAt": 0}, {"id": "y", "content": "added"}]"#)
            .await
            .unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].content, "new");
        let (persisted, backend) = store.load_prompts().await.unwrap();
        assert_eq!(persisted, merged);
        assert_eq!(backend, StorageBackend::Notion);
    }

    #[tokio::test]
    async fn test_rejected_import_changes_nothing() {
        let (store, _, service) = service(FakeRemote::default());
        store
            .save_prompts(&[prompt("x", "old", 1)], StorageBackend::Local)
            .await
            .unwrap();

        let err = service
            .import_from_str(r#"[{"id": "x", "content": "new"}, {"content": "no id"}]"#)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(service.list().await.unwrap()[0].content, "old");
    }

    #[tokio::test]
    async fn test_export_then_import_roundtrip() {
        let (store, _, service) = service(FakeRemote::default());
        let original = vec![prompt("a", "one", 1), prompt("b", "two", 2)];
        store
            .save_prompts(&original, StorageBackend::Local)
            .await
            .unwrap();

        let exported = service.export_json().await.unwrap();
        let merged = service.import_from_str(&exported).await.unwrap();

        assert_eq!(merged, original);
    }

    #[tokio::test]
    async fn test_search_uses_stored_prompts() {
        let (store, _, service) = service(FakeRemote::default());
        store
            .save_prompts(
                &[prompt("a", "Hello World", 1), prompt("b", "other", 1)],
                StorageBackend::Local,
            )
            .await
            .unwrap();

        let found = service.search("hello", &[]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "a");
    }
}
