//! Domain models for stored prompts.
//!
//! A [`Prompt`] is the unit of storage shared by the local record store,
//! the Notion database and the import/export format.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::error::{AppError, Result};

/// Title assigned to prompts created without one.
pub const UNTITLED_PROMPT: &str = "Untitled Prompt";

/// Maximum prompt content length accepted on create and edit.
pub const MAX_CONTENT_LENGTH: usize = 2000;

/// Ids longer than this were assigned by Notion rather than generated locally.
pub const REMOTE_ID_MIN_LEN: usize = 31;

/// Tags offered before the user has saved any of their own.
pub const DEFAULT_TAGS: [&str; 8] = [
    "General",
    "Education & Learning",
    "Personal",
    "Coding & Development",
    "AI Roleplay & Agents",
    "Writing",
    "Research",
    "Design",
];

/// A stored text snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    /// Local short token or Notion page id.
    pub id: String,
    /// Display label.
    pub title: String,
    /// The prompt text.
    pub content: String,
    /// Tag labels; `None` rather than an empty list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Creation time, epoch milliseconds.
    pub created_at: i64,
    /// Last content change, epoch milliseconds. Decides sync conflicts.
    pub updated_at: i64,
}

impl PartialEq for Prompt {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.content == other.content
            && self.created_at == other.created_at
            && self.updated_at == other.updated_at
            && same_tags(self.tags.as_deref(), other.tags.as_deref())
    }
}

impl Eq for Prompt {}

impl Prompt {
    /// Build a new prompt with a fresh local id and both timestamps set to now.
    ///
    /// # Errors
    /// Returns a validation error if the content is empty or too long.
    pub fn create(input: NewPrompt) -> Result<Self> {
        let content = validate_content(&input.content)?;
        let now = now_millis();

        Ok(Self {
            id: generate_local_id(),
            title: normalize_title(input.title.as_deref()),
            content,
            tags: normalize_tags(input.tags),
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply an edit and refresh `updated_at`.
    ///
    /// # Errors
    /// Returns a validation error if the new content is empty or too long.
    pub fn apply(&mut self, patch: PromptPatch) -> Result<()> {
        if let Some(content) = patch.content {
            self.content = validate_content(&content)?;
        }
        if let Some(title) = patch.title {
            self.title = normalize_title(Some(&title));
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(Some(tags));
        }
        self.touch();
        Ok(())
    }

    /// Refresh `updated_at`, keeping it strictly increasing.
    pub fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at + 1);
    }

    /// Whether this id was assigned by Notion.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        is_remote_id(&self.id)
    }

    /// Whether the prompt carries the given tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags
            .as_ref()
            .is_some_and(|tags| tags.iter().any(|t| t == tag))
    }
}

/// Input for creating a prompt.
#[derive(Debug, Clone, Default)]
pub struct NewPrompt {
    pub title: Option<String>,
    pub content: String,
    pub tags: Option<Vec<String>>,
}

/// Partial update of a prompt. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct PromptPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl PromptPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.tags.is_none()
    }
}

/// Active persistence target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Record store only.
    #[default]
    Local,
    /// Notion database, mirrored into the record store.
    Notion,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Notion => write!(f, "notion"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "notion" | "remote" => Ok(Self::Notion),
            _ => Err(format!("Unknown backend: {s}. Use: local, notion")),
        }
    }
}

/// Current time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Generate a short local id (12 hex chars).
#[must_use]
pub fn generate_local_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}

/// Whether an id has the shape of a Notion page id.
#[must_use]
pub fn is_remote_id(id: &str) -> bool {
    id.len() >= REMOTE_ID_MIN_LEN
}

/// Trim the title, falling back to [`UNTITLED_PROMPT`] when blank.
#[must_use]
pub fn normalize_title(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => UNTITLED_PROMPT.to_string(),
    }
}

/// Trim tags, drop blanks and duplicates, and map an empty list to `None`.
#[must_use]
pub fn normalize_tags(tags: Option<Vec<String>>) -> Option<Vec<String>> {
    let mut seen = HashSet::new();
    let tags: Vec<String> = tags?
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect();

    if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}

/// Compare two tag lists as sets. Absent and empty are equal.
#[must_use]
pub fn same_tags(a: Option<&[String]>, b: Option<&[String]>) -> bool {
    let a: HashSet<&str> = a.unwrap_or_default().iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.unwrap_or_default().iter().map(String::as_str).collect();
    a == b
}

/// Trim content and check it is non-empty and within the length limit.
fn validate_content(content: &str) -> Result<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::validation("Prompt content is required"));
    }
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(AppError::validation(format!(
            "Content exceeds maximum length of {MAX_CONTENT_LENGTH} characters"
        )));
    }
    Ok(content.to_string())
}
