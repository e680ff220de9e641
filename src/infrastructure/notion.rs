//! Notion REST client for the prompt database.
//!
//! Prompts are stored as pages of a database with three properties:
//! `Title` (title), `Content` (rich text) and `Tags` (multi-select).

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Method;
use serde_json::{json, Map, Value};

use crate::domain::{
    is_remote_id, normalize_tags, normalize_title, AppError, NotionSettings, Prompt,
    RemoteConfig, Result, UNTITLED_PROMPT,
};

use super::remote::{ContainerResolution, FetchOutcome, RemoteCollection};

/// Title given to databases created under a plain page.
const DATABASE_TITLE: &str = "Prompt Manager";

/// Notion rejects text objects longer than this, in titles and rich text alike.
const RICH_TEXT_LIMIT: usize = 2000;

/// Fallback when an error response carries no message.
const GENERIC_FAILURE: &str = "Failed to communicate with Notion API";

/// HTTP client for the Notion API.
pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    page_size: u32,
}

impl NotionClient {
    /// Build a client from settings.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(settings: &NotionSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AppError::remote(&e))?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_version: settings.api_version.clone(),
            page_size: settings.page_size.clamp(1, 100),
        })
    }

    /// Send one authenticated request and decode the JSON response.
    async fn request(
        &self,
        config: &RemoteConfig,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("{}{endpoint}", self.base_url);
        tracing::trace!(%method, %url, "Notion request");

        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&config.api_key)
            .header("Notion-Version", &self.api_version);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| AppError::remote(&e))?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
                .unwrap_or_else(|| GENERIC_FAILURE.to_string());
            return Err(AppError::Remote {
                message,
                status: Some(status.as_u16()),
            });
        }

        response.json().await.map_err(|e| AppError::remote(&e))
    }

    async fn create_database(&self, config: &RemoteConfig) -> Result<String> {
        let body = json!({
            "parent": { "type": "page_id", "page_id": config.page_id },
            "title": [{ "type": "text", "text": { "content": DATABASE_TITLE } }],
            "properties": {
                "Title": { "title": {} },
                "Content": { "rich_text": {} },
                "Tags": { "multi_select": { "options": [] } },
            },
        });

        let response = self
            .request(config, Method::POST, "/databases", Some(&body))
            .await?;

        response
            .get("id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| AppError::Remote {
                message: "Database creation returned no id".into(),
                status: None,
            })
    }
}

#[async_trait]
impl RemoteCollection for NotionClient {
    async fn test_connection(&self, config: &RemoteConfig) -> bool {
        let page = format!("/pages/{}", config.page_id);
        let database = format!("/databases/{}", config.page_id);

        match self.request(config, Method::GET, &page, None).await {
            Ok(_) => true,
            Err(page_err) => match self.request(config, Method::GET, &database, None).await {
                Ok(_) => true,
                Err(_) => {
                    tracing::debug!(error = %page_err, "Notion connection test failed");
                    false
                }
            },
        }
    }

    async fn resolve_container(&self, config: &RemoteConfig) -> Result<ContainerResolution> {
        let endpoint = format!("/databases/{}", config.page_id);

        match self.request(config, Method::GET, &endpoint, None).await {
            Ok(found) if found.get("object").and_then(Value::as_str) == Some("database") => {
                Ok(ContainerResolution {
                    container_id: config.page_id.clone(),
                    provisioned: false,
                })
            }
            Ok(_) | Err(AppError::Remote { status: Some(400 | 404), .. }) => {
                let container_id = self.create_database(config).await?;
                tracing::info!(parent = %config.page_id, database = %container_id, "Created prompt database");
                Ok(ContainerResolution {
                    container_id,
                    provisioned: true,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_all(&self, config: &RemoteConfig) -> Result<FetchOutcome> {
        let endpoint = format!("/databases/{}/query", config.page_id);
        let mut outcome = FetchOutcome::default();
        let mut cursor: Option<String> = None;
        let mut seen_cursors = HashSet::new();

        loop {
            let mut body = json!({ "page_size": self.page_size });
            if let Some(ref c) = cursor {
                body["start_cursor"] = json!(c);
            }

            let response = self
                .request(config, Method::POST, &endpoint, Some(&body))
                .await?;

            let results = response
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| AppError::Remote {
                    message: "Database query returned no results list".into(),
                    status: None,
                })?;

            for page in results {
                if page.get("archived").and_then(Value::as_bool) == Some(true) {
                    continue;
                }
                match page_to_prompt(page) {
                    Ok(prompt) => outcome.prompts.push(prompt),
                    Err(e) => {
                        outcome.dropped += 1;
                        tracing::warn!(
                            page = page.get("id").and_then(serde_json::Value::as_str).unwrap_or("?"),
                            error = %e,
                            "Skipping remote page"
                        );
                    }
                }
            }

            let has_more = response.get("has_more").and_then(Value::as_bool) == Some(true);
            cursor = response
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(String::from);
            match cursor {
                Some(ref next) if has_more => {
                    if !seen_cursors.insert(next.clone()) {
                        return Err(AppError::Remote {
                            message: format!("Database query repeated cursor {next}"),
                            status: None,
                        });
                    }
                }
                _ => break,
            }
        }

        tracing::debug!(
            fetched = outcome.prompts.len(),
            dropped = outcome.dropped,
            "Fetched remote prompts"
        );
        Ok(outcome)
    }

    async fn create_or_update(
        &self,
        config: &RemoteConfig,
        prompt: &Prompt,
    ) -> Result<Option<Prompt>> {
        let properties = prompt_properties(prompt);

        let response = if is_remote_id(&prompt.id) {
            let body = json!({ "properties": properties });
            self.request(
                config,
                Method::PATCH,
                &format!("/pages/{}", prompt.id),
                Some(&body),
            )
            .await?
        } else {
            let body = json!({
                "parent": { "database_id": config.page_id },
                "properties": properties,
            });
            self.request(config, Method::POST, "/pages", Some(&body))
                .await?
        };

        match page_to_prompt(&response) {
            Ok(stored) => Ok(Some(stored)),
            Err(e) => {
                tracing::debug!(id = %prompt.id, error = %e, "Write response not convertible");
                Ok(None)
            }
        }
    }

    async fn archive(&self, config: &RemoteConfig, id: &str) -> Result<()> {
        let body = json!({ "archived": true });
        match self
            .request(config, Method::PATCH, &format!("/pages/{id}"), Some(&body))
            .await
        {
            Ok(_) => Ok(()),
            Err(AppError::Remote {
                status: Some(400),
                ref message,
            }) if message.to_lowercase().contains("archived") => {
                tracing::debug!(%id, "Page already archived");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Map a Notion page object to a prompt.
///
/// # Errors
/// Returns a conversion error when the id, the title property, the
/// `Content` rich text, the tags or the timestamps are missing or malformed.
pub fn page_to_prompt(page: &Value) -> Result<Prompt> {
    let id = page
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| conversion("page has no id"))?;

    let properties = page
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| conversion(format!("page {id} has no properties")))?;

    let title_segments = properties
        .values()
        .find(|p| p.get("type").and_then(Value::as_str) == Some("title"))
        .and_then(|p| p.get("title"))
        .ok_or_else(|| conversion(format!("page {id} has no title property")))?;
    let title = join_rich_text(title_segments)
        .ok_or_else(|| conversion(format!("page {id} has a malformed title")))?;

    let content = properties
        .get("Content")
        .filter(|p| p.get("type").and_then(Value::as_str) == Some("rich_text"))
        .and_then(|p| p.get("rich_text"))
        .and_then(join_rich_text)
        .ok_or_else(|| conversion(format!("page {id} has no readable Content")))?;
    if content.trim().is_empty() {
        return Err(conversion(format!("page {id} has empty Content")));
    }

    let tags = match properties.get("Tags") {
        None | Some(Value::Null) => None,
        Some(prop) => Some(read_multi_select(prop).ok_or_else(|| {
            conversion(format!("page {id} has malformed Tags"))
        })?),
    };

    let created_at = read_timestamp(page, "created_time")
        .ok_or_else(|| conversion(format!("page {id} has no created_time")))?;
    let updated_at = read_timestamp(page, "last_edited_time")
        .ok_or_else(|| conversion(format!("page {id} has no last_edited_time")))?;

    Ok(Prompt {
        id: id.to_string(),
        title: normalize_title(Some(&title)),
        content,
        tags: normalize_tags(tags),
        created_at,
        updated_at: updated_at.max(created_at),
    })
}

/// Build the property payload written for a prompt.
#[must_use]
pub fn prompt_properties(prompt: &Prompt) -> Value {
    let title = if prompt.title.trim().is_empty() {
        UNTITLED_PROMPT
    } else {
        prompt.title.as_str()
    };

    let mut properties = Map::new();
    properties.insert(
        "Title".into(),
        json!({ "title": rich_text_segments(title) }),
    );
    properties.insert(
        "Content".into(),
        json!({ "rich_text": rich_text_segments(&prompt.content) }),
    );
    if let Some(tags) = prompt.tags.as_ref().filter(|t| !t.is_empty()) {
        let options: Vec<Value> = tags.iter().map(|t| json!({ "name": t })).collect();
        properties.insert("Tags".into(), json!({ "multi_select": options }));
    }

    Value::Object(properties)
}

/// Split text into rich text segments within Notion's length limit.
fn rich_text_segments(text: &str) -> Vec<Value> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(RICH_TEXT_LIMIT)
        .map(|chunk| {
            let content: String = chunk.iter().collect();
            json!({ "text": { "content": content } })
        })
        .collect()
}

fn join_rich_text(segments: &Value) -> Option<String> {
    segments
        .as_array()?
        .iter()
        .map(|s| s.get("plain_text").and_then(Value::as_str))
        .collect()
}

fn read_multi_select(prop: &Value) -> Option<Vec<String>> {
    prop.get("multi_select")?
        .as_array()?
        .iter()
        .map(|o| o.get("name").and_then(Value::as_str).map(String::from))
        .collect()
}

fn read_timestamp(page: &Value, field: &str) -> Option<i64> {
    let raw = page.get(field)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

fn conversion(message: impl Into<String>) -> AppError {
    AppError::Conversion {
        message: message.into(),
    }
}
