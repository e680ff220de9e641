//! Sync-related domain models and configuration.
//!
//! Contains the persisted sync status, the Notion credentials, the
//! application state snapshot and the TOML-backed application config.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::models::{now_millis, Prompt, StorageBackend};

/// Outcome of the most recent sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Last successful sync, epoch milliseconds.
    pub last_synced: Option<i64>,
    /// Whether a sync is currently running.
    pub in_progress: bool,
    /// Message of the last failed run, cleared when a new run starts.
    pub error: Option<String>,
}

impl SyncStatus {
    /// Apply a partial update.
    #[must_use]
    pub fn merged(mut self, patch: SyncStatusPatch) -> Self {
        if let Some(last_synced) = patch.last_synced {
            self.last_synced = Some(last_synced);
        }
        if let Some(in_progress) = patch.in_progress {
            self.in_progress = in_progress;
        }
        if let Some(error) = patch.error {
            self.error = error;
        }
        self
    }
}

/// Partial update of [`SyncStatus`]. `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatusPatch {
    pub last_synced: Option<i64>,
    pub in_progress: Option<bool>,
    pub error: Option<Option<String>>,
}

impl SyncStatusPatch {
    /// A run is starting: mark in progress and clear the previous error.
    #[must_use]
    pub const fn started() -> Self {
        Self {
            last_synced: None,
            in_progress: Some(true),
            error: Some(None),
        }
    }

    /// A run succeeded now.
    #[must_use]
    pub fn succeeded() -> Self {
        Self {
            last_synced: Some(now_millis()),
            in_progress: Some(false),
            error: None,
        }
    }

    /// A run failed. `last_synced` is left untouched.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            last_synced: None,
            in_progress: Some(false),
            error: Some(Some(message.into())),
        }
    }
}

/// Notion credentials and the page or database holding the prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    /// Integration token.
    pub api_key: String,
    /// Page id (before provisioning) or database id (after).
    pub page_id: String,
}

impl RemoteConfig {
    /// Same credentials pointing at another container.
    #[must_use]
    pub fn with_container(&self, container_id: impl Into<String>) -> Self {
        Self {
            api_key: self.api_key.clone(),
            page_id: container_id.into(),
        }
    }
}

/// Everything the front end needs to render, loaded in one go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub prompts: Vec<Prompt>,
    pub backend: StorageBackend,
    pub tags: Vec<String>,
}

/// Notion client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionSettings {
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Value of the `Notion-Version` header.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Results requested per database query page (Notion caps this at 100).
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Sync after every local change while Notion is the active backend.
    #[serde(default)]
    pub auto_sync: bool,
}

impl Default for NotionSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            timeout_secs: default_timeout(),
            page_size: default_page_size(),
            auto_sync: false,
        }
    }
}

fn default_base_url() -> String {
    "https://api.notion.com/v1".to_string()
}

fn default_api_version() -> String {
    "2022-06-28".to_string()
}

const fn default_timeout() -> u64 {
    30
}

const fn default_page_size() -> u32 {
    100
}

/// Path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathConfig {
    /// Base data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Notion client configuration.
    #[serde(default)]
    pub notion: NotionSettings,

    /// Path configuration.
    #[serde(default)]
    pub paths: PathConfig,
}

impl AppConfig {
    /// Get the data directory, using default if not configured.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.paths
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".prompt-sync")
    }

    /// Get the record store database path.
    #[must_use]
    pub fn records_db_path(&self) -> PathBuf {
        self.data_dir().join("records.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.notion.base_url, "https://api.notion.com/v1");
        assert_eq!(config.notion.api_version, "2022-06-28");
        assert_eq!(config.notion.page_size, 100);
        assert!(!config.notion.auto_sync);
        assert!(config.records_db_path().ends_with("records.db"));
    }

    #[test]
    fn test_status_lifecycle() {
        let previous = SyncStatus {
            last_synced: Some(42),
            in_progress: false,
            error: Some("old failure".into()),
        };

        let running = previous.clone().merged(SyncStatusPatch::started());
        assert!(running.in_progress);
        assert_eq!(running.error, None);
        assert_eq!(running.last_synced, Some(42));

        let failed = running.clone().merged(SyncStatusPatch::failed("boom"));
        assert!(!failed.in_progress);
        assert_eq!(failed.error.as_deref(), Some("boom"));
        assert_eq!(failed.last_synced, Some(42));

        let done = running.merged(SyncStatusPatch::succeeded());
        assert!(!done.in_progress);
        assert!(done.last_synced.unwrap() > 42);
    }

    #[test]
    fn test_status_uses_camel_case_keys() {
        let json = serde_json::to_value(SyncStatus::default()).unwrap();
        assert!(json.get("lastSynced").is_some());
        assert!(json.get("inProgress").is_some());
    }
}
