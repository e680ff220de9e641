//! Infrastructure layer - external adapters (record store, Notion API, config).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod config;
pub mod local_storage;
pub mod notion;
pub mod prompt_store;
pub mod record_store;
pub mod remote;

pub use config::{config_file_path, ensure_config_exists, load_config};
pub use local_storage::LocalStorage;
pub use notion::NotionClient;
pub use prompt_store::PromptStore;
pub use remote::RemoteCollection;
