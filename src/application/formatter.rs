//! Output formatting for prompts and sync state.
//!
//! Supports a table view for terminals and JSON for scripting.

use chrono::DateTime;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::{Prompt, RemoteConfig, StorageBackend, SyncStatus};

use super::sync_service::SyncReport;

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Compact table listing.
    #[default]
    Table,
    /// JSON format for programmatic use.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Use: table, json")),
        }
    }
}

/// Formats a table listing of prompts.
pub fn format_prompts_table(prompts: &[Prompt]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Updated", "Title", "Tags", "Content"]);

    for prompt in prompts {
        let tags = prompt
            .tags
            .as_ref()
            .map_or_else(|| "-".to_string(), |t| truncate(&t.join(", "), 24));

        table.add_row(vec![
            short_id(&prompt.id),
            format_millis(prompt.updated_at),
            truncate(&prompt.title, 28),
            tags,
            truncate(&prompt.content, 40),
        ]);
    }

    table.to_string()
}

/// Formats one prompt in full.
pub fn format_prompt_detail(prompt: &Prompt) -> String {
    let tags = prompt
        .tags
        .as_ref()
        .map_or_else(|| "-".to_string(), |t| t.join(", "));

    format!(
        "{}\n  ID: {}\n  Tags: {}\n  Created: {}\n  Updated: {}\n\n{}",
        prompt.title.bold(),
        prompt.id.cyan(),
        tags,
        format_millis(prompt.created_at),
        format_millis(prompt.updated_at),
        prompt.content
    )
}

/// Formats prompts as JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_prompts_json(prompts: &[Prompt]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(prompts)
}

/// Formats the tag list, one per line.
pub fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| format!("  • {t}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Formats backend, connection and sync state.
pub fn format_status(
    backend: StorageBackend,
    remote: Option<&RemoteConfig>,
    status: &SyncStatus,
    prompt_count: usize,
) -> String {
    let connection = remote.map_or_else(
        || "not connected".yellow().to_string(),
        |c| format!("page {}", c.page_id).green().to_string(),
    );

    let last_synced = status
        .last_synced
        .map_or_else(|| "never".to_string(), format_millis);

    let state = if status.in_progress {
        "in progress".yellow().to_string()
    } else {
        "idle".to_string()
    };

    let mut out = format!(
        "{}\n  Backend: {}\n  Notion: {}\n  Prompts: {}\n  Last synced: {}\n  Sync: {}",
        "📊 Status".bold(),
        backend.to_string().cyan(),
        connection,
        prompt_count.to_string().cyan(),
        last_synced,
        state
    );

    if let Some(ref error) = status.error {
        out.push_str(&format!("\n  Last error: {}", error.red()));
    }

    out
}

/// Formats a summary of a sync pass.
pub fn format_sync_report(report: &SyncReport) -> String {
    let mut out = format!(
        "{} {} prompts\n  Created in Notion: {}\n  Updated in Notion: {}\n  Pulled from Notion: {}",
        "✓ Synced".green().bold(),
        report.prompts.len(),
        report.created.to_string().cyan(),
        report.updated.to_string().cyan(),
        report.pulled.to_string().cyan()
    );

    if report.dropped > 0 {
        out.push_str(&format!(
            "\n  Skipped unreadable pages: {}",
            report.dropped.to_string().yellow()
        ));
    }
    if report.provisioned {
        out.push_str("\n  Created the Prompts database");
    }

    out
}

fn short_id(id: &str) -> String {
    id.chars().take(12).collect()
}

fn format_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis).map_or_else(
        || "-".to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M").to_string(),
    )
}

/// Truncates to the first line and at most `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
