//! Application layer - use cases and orchestration.
//!
//! This layer contains prompt management, search, import/export and the
//! Notion sync engine.

pub mod formatter;
pub mod prompt_service;
pub mod search;
pub mod sync_service;
pub mod transfer;

pub use formatter::{
    format_prompt_detail, format_prompts_json, format_prompts_table, format_status,
    format_sync_report, format_tags, OutputFormat,
};
pub use prompt_service::PromptService;
pub use sync_service::SyncService;
