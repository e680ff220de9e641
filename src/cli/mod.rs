//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use clap::{Parser, Subcommand};

use crate::application::OutputFormat;
use crate::domain::StorageBackend;

/// Prompt Sync - Manage reusable AI prompts locally and sync them with Notion.
///
/// Quick start: prompt-sync init | add "text" -t Coding | connect --api-key K --page-id P | sync
#[derive(Parser, Debug)]
#[command(name = "prompt-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format: table or json.
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the default config file and seed the tag list.
    Init,

    /// Add a prompt.
    Add {
        /// Prompt text (read from stdin if omitted).
        content: Option<String>,

        /// Prompt title.
        #[arg(long)]
        title: Option<String>,

        /// Tags, comma separated or repeated.
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Save selected text piped on stdin as a prompt.
    Capture {
        /// Prompt title.
        #[arg(long)]
        title: Option<String>,

        /// Tags, comma separated or repeated.
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Edit a prompt.
    Edit {
        /// Prompt ID (full or unique prefix).
        id: String,

        /// New title.
        #[arg(long)]
        title: Option<String>,

        /// New text.
        #[arg(long)]
        content: Option<String>,

        /// Replace tags, comma separated or repeated.
        #[arg(short, long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },

    /// Delete a prompt (archived in Notion when that backend is active).
    Delete {
        /// Prompt ID (full or unique prefix).
        id: String,
    },

    /// List all prompts.
    List,

    /// Show a prompt in full.
    Show {
        /// Prompt ID (full or unique prefix).
        id: String,
    },

    /// Search prompts by text and tags.
    Search {
        /// Text to look for in titles and content.
        #[arg(default_value = "")]
        query: String,

        /// Only prompts with any of these tags.
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// List known tags.
    Tags,

    /// Export all prompts as JSON.
    Export {
        /// Output file path (stdout if not specified).
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import prompts from a JSON export.
    Import {
        /// Input file path (stdin if not specified).
        input: Option<String>,
    },

    /// Switch the active storage backend: local or notion.
    Backend {
        /// Backend to activate.
        backend: StorageBackend,
    },

    /// Store Notion credentials after testing them.
    Connect {
        /// Notion integration token.
        #[arg(long)]
        api_key: String,

        /// Parent page or Prompts database ID.
        #[arg(long)]
        page_id: String,
    },

    /// Forget Notion credentials and switch back to local storage.
    Disconnect,

    /// Run a bidirectional sync with Notion.
    Sync {
        /// Start even if a previous run is still marked in progress.
        #[arg(long)]
        force: bool,
    },

    /// Show backend, connection and sync status.
    Status,
}

impl Cli {
    /// Parse the output format argument.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}

impl Commands {
    /// Whether the command changes the prompt collection or the active backend.
    #[must_use]
    pub const fn mutates_prompts(&self) -> bool {
        matches!(
            self,
            Self::Add { .. }
                | Self::Capture { .. }
                | Self::Edit { .. }
                | Self::Delete { .. }
                | Self::Import { .. }
                | Self::Backend { .. }
        )
    }
}
