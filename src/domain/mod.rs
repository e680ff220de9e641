//! Domain layer - core types and rules.
//!
//! This layer contains pure domain models and error types
//! without any I/O (record store, HTTP, filesystem).

pub mod error;
pub mod models;
pub mod sync;

pub use error::{AppError, Result};
pub use models::{
    is_remote_id, normalize_tags, normalize_title, now_millis, NewPrompt, Prompt, PromptPatch,
    StorageBackend, DEFAULT_TAGS, UNTITLED_PROMPT,
};
pub use sync::{AppConfig, AppState, NotionSettings, RemoteConfig, SyncStatus, SyncStatusPatch};
