//! Typed access to the named records: prompt collection, active backend,
//! tag list, Notion credentials and sync status.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::domain::{
    AppError, AppState, Prompt, RemoteConfig, Result, StorageBackend, SyncStatus,
    SyncStatusPatch, DEFAULT_TAGS,
};

use super::record_store::RecordStore;

/// Record keys. Kept stable so existing stores stay readable.
pub mod keys {
    pub const PROMPTS: &str = "prompts";
    pub const STORAGE_TYPE: &str = "storageType";
    pub const NOTION_CONFIG: &str = "notionConfig";
    pub const SYNC_STATUS: &str = "syncStatus";
    pub const TAGS: &str = "tags";
}

/// Repository over a [`RecordStore`].
#[derive(Clone)]
pub struct PromptStore {
    records: Arc<dyn RecordStore>,
}

impl PromptStore {
    #[must_use]
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Load the prompt collection and the active backend.
    ///
    /// # Errors
    /// Returns error if the store fails or a record is malformed.
    pub async fn load_prompts(&self) -> Result<(Vec<Prompt>, StorageBackend)> {
        let mut found = self
            .records
            .get(&[keys::PROMPTS, keys::STORAGE_TYPE])
            .await?;

        let prompts = take::<Vec<Prompt>>(&mut found, keys::PROMPTS)?.unwrap_or_default();
        let backend = take::<StorageBackend>(&mut found, keys::STORAGE_TYPE)?.unwrap_or_default();

        Ok((prompts, backend))
    }

    /// Replace the collection, record the backend and refresh the derived
    /// tag list. The three keys go out in a single `set`.
    ///
    /// # Errors
    /// Returns error if the store rejects the write.
    pub async fn save_prompts(&self, prompts: &[Prompt], backend: StorageBackend) -> Result<()> {
        let mut entries = HashMap::new();
        entries.insert(keys::PROMPTS.to_string(), to_value(prompts)?);
        entries.insert(keys::STORAGE_TYPE.to_string(), to_value(backend)?);
        entries.insert(keys::TAGS.to_string(), to_value(collect_tags(prompts))?);

        self.records.set(entries).await?;
        tracing::debug!(count = prompts.len(), %backend, "Prompts saved");
        Ok(())
    }

    /// Record the active backend without touching the collection.
    ///
    /// # Errors
    /// Returns error if the store rejects the write.
    pub async fn set_backend(&self, backend: StorageBackend) -> Result<()> {
        self.put(keys::STORAGE_TYPE, backend).await
    }

    /// Saved tags, or the default list when none are saved.
    ///
    /// # Errors
    /// Returns error if the store fails or the record is malformed.
    pub async fn all_tags(&self) -> Result<Vec<String>> {
        let saved = self.fetch::<Vec<String>>(keys::TAGS).await?;
        Ok(match saved {
            Some(tags) if !tags.is_empty() => tags,
            _ => default_tags(),
        })
    }

    /// Write the default tag list unless tags already exist.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn initialize_default_tags(&self) -> Result<()> {
        let existing = self.fetch::<Vec<String>>(keys::TAGS).await?;
        if existing.is_some_and(|tags| !tags.is_empty()) {
            return Ok(());
        }
        self.put(keys::TAGS, default_tags()).await
    }

    /// Everything a front end renders, in one read.
    ///
    /// # Errors
    /// Returns error if the store fails or a record is malformed.
    pub async fn load_state(&self) -> Result<AppState> {
        let (prompts, backend) = self.load_prompts().await?;
        let tags = self.all_tags().await?;
        Ok(AppState {
            prompts,
            backend,
            tags,
        })
    }

    /// Stored Notion credentials, if any.
    ///
    /// # Errors
    /// Returns error if the store fails or the record is malformed.
    pub async fn remote_config(&self) -> Result<Option<RemoteConfig>> {
        self.fetch(keys::NOTION_CONFIG).await
    }

    /// Persist Notion credentials.
    ///
    /// # Errors
    /// Returns error if the store rejects the write.
    pub async fn save_remote_config(&self, config: &RemoteConfig) -> Result<()> {
        self.put(keys::NOTION_CONFIG, config).await
    }

    /// Forget Notion credentials.
    ///
    /// # Errors
    /// Returns error if the store rejects the removal.
    pub async fn clear_remote_config(&self) -> Result<()> {
        self.records.remove(keys::NOTION_CONFIG).await
    }

    /// Current sync status, defaulting to "never synced".
    ///
    /// # Errors
    /// Returns error if the store fails or the record is malformed.
    pub async fn sync_status(&self) -> Result<SyncStatus> {
        Ok(self.fetch(keys::SYNC_STATUS).await?.unwrap_or_default())
    }

    /// Merge a partial update into the stored status and return the result.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn update_sync_status(&self, patch: SyncStatusPatch) -> Result<SyncStatus> {
        let status = self.sync_status().await?.merged(patch);
        self.put(keys::SYNC_STATUS, &status).await?;
        Ok(status)
    }

    async fn fetch<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut found = self.records.get(&[key]).await?;
        take(&mut found, key)
    }

    async fn put<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let entries = HashMap::from([(key.to_string(), to_value(value)?)]);
        self.records.set(entries).await
    }
}

/// Unique tags in first-seen order.
#[must_use]
pub fn collect_tags(prompts: &[Prompt]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in prompts.iter().filter_map(|p| p.tags.as_ref()).flatten() {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}

fn default_tags() -> Vec<String> {
    DEFAULT_TAGS.iter().map(ToString::to_string).collect()
}

fn take<T: DeserializeOwned>(found: &mut HashMap<String, Value>, key: &str) -> Result<Option<T>> {
    match found.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| AppError::corrupt_record(key, e)),
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(AppError::json_parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::record_store::memory::MemoryRecordStore;
    use serde_json::json;

    fn prompt(id: &str, tags: &[&str]) -> Prompt {
        Prompt {
            id: id.into(),
            title: format!("title {id}"),
            content: format!("content {id}"),
            tags: crate::domain::normalize_tags(Some(
                tags.iter().map(ToString::to_string).collect(),
            )),
            created_at: 1,
            updated_at: 2,
        }
    }

    fn store() -> (Arc<MemoryRecordStore>, PromptStore) {
        let records = Arc::new(MemoryRecordStore::new());
        let store = PromptStore::new(records.clone());
        (records, store)
    }

    #[tokio::test]
    async fn test_empty_store_defaults() {
        let (_, store) = store();

        let (prompts, backend) = store.load_prompts().await.unwrap();
        assert!(prompts.is_empty());
        assert_eq!(backend, StorageBackend::Local);
        assert_eq!(store.all_tags().await.unwrap().len(), DEFAULT_TAGS.len());
        assert_eq!(store.sync_status().await.unwrap(), SyncStatus::default());
        assert!(store.remote_config().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_prompts_derives_tags() {
        let (records, store) = store();
        let prompts = vec![prompt("a", &["x", "y"]), prompt("b", &["y", "z"]), prompt("c", &[])];

        store
            .save_prompts(&prompts, StorageBackend::Notion)
            .await
            .unwrap();

        assert_eq!(records.raw(keys::TAGS), Some(json!(["x", "y", "z"])));
        assert_eq!(records.raw(keys::STORAGE_TYPE), Some(json!("notion")));

        let (loaded, backend) = store.load_prompts().await.unwrap();
        assert_eq!(loaded, prompts);
        assert_eq!(backend, StorageBackend::Notion);
    }

    #[tokio::test]
    async fn test_initialize_default_tags_keeps_existing() {
        let (records, store) = store();
        records.insert_raw(keys::TAGS, json!(["mine"]));

        store.initialize_default_tags().await.unwrap();
        assert_eq!(store.all_tags().await.unwrap(), vec!["mine".to_string()]);

        records.insert_raw(keys::TAGS, json!([]));
        store.initialize_default_tags().await.unwrap();
        assert_eq!(records.raw(keys::TAGS).unwrap().as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_remote_config_roundtrip_and_clear() {
        let (records, store) = store();
        let config = RemoteConfig {
            api_key: "secret_abc".into(),
            page_id: "page".into(),
        };

        store.save_remote_config(&config).await.unwrap();
        assert_eq!(
            records.raw(keys::NOTION_CONFIG),
            Some(json!({"apiKey": "secret_abc", "pageId": "page"}))
        );
        assert_eq!(store.remote_config().await.unwrap(), Some(config));

        store.clear_remote_config().await.unwrap();
        assert!(store.remote_config().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_sync_status_merges() {
        let (_, store) = store();

        store
            .update_sync_status(SyncStatusPatch::succeeded())
            .await
            .unwrap();
        let last = store.sync_status().await.unwrap().last_synced;

        let status = store
            .update_sync_status(SyncStatusPatch::failed("offline"))
            .await
            .unwrap();
        assert_eq!(status.last_synced, last);
        assert_eq!(status.error.as_deref(), Some("offline"));
    }

    #[tokio::test]
    async fn test_write_failure_surfaces() {
        let (records, store) = store();
        records.fail_writes(true);

        let err = store
            .save_prompts(&[prompt("a", &[])], StorageBackend::Local)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_malformed_record_names_key() {
        let (records, store) = store();
        records.insert_raw(keys::PROMPTS, json!({"not": "a list"}));

        let err = store.load_prompts().await.unwrap_err();
        assert!(err.to_string().contains("prompts"));
    }
}
