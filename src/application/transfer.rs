//! Import/export of prompt collections as JSON.
//!
//! Export writes a pretty-printed array. Import is all-or-nothing: one bad
//! element rejects the whole payload. Imported prompts overwrite existing
//! prompts with the same id regardless of timestamps.

use std::collections::HashMap;

use serde_json::Value;

use crate::domain::{normalize_tags, normalize_title, now_millis, AppError, Prompt, Result};

/// Serialize a collection for export.
///
/// # Errors
/// Returns error if serialization fails.
pub fn export_prompts(prompts: &[Prompt]) -> Result<String> {
    serde_json::to_string_pretty(prompts).map_err(AppError::json_parse)
}

/// Parse and validate an exported collection.
///
/// Requires a JSON array whose elements all carry a non-empty `id` and
/// `content`. A missing title becomes "Untitled Prompt" and missing
/// timestamps default to now. Unknown keys are ignored.
///
/// # Errors
/// Returns a validation error describing the first problem found.
pub fn parse_import(text: &str) -> Result<Vec<Prompt>> {
    let parsed: Value = serde_json::from_str(text)
        .map_err(|e| AppError::validation(format!("Not valid JSON: {e}")))?;

    let Value::Array(items) = parsed else {
        return Err(AppError::validation(
            "Invalid format: Expected an array of prompts",
        ));
    };

    let now = now_millis();
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            parse_item(item, now)
                .map_err(|msg| AppError::validation(format!("Prompt {}: {msg}", i + 1)))
        })
        .collect()
}

/// Merge imported prompts into a collection. Existing ids are replaced in
/// place; new ids are appended in import order.
#[must_use]
pub fn merge_import(current: Vec<Prompt>, imported: Vec<Prompt>) -> Vec<Prompt> {
    let mut merged = current;
    let mut positions: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.clone(), i))
        .collect();

    for prompt in imported {
        if let Some(&pos) = positions.get(&prompt.id) {
            merged[pos] = prompt;
        } else {
            positions.insert(prompt.id.clone(), merged.len());
            merged.push(prompt);
        }
    }

    merged
}

fn parse_item(item: &Value, now: i64) -> std::result::Result<Prompt, String> {
    let obj = item.as_object().ok_or("expected an object")?;

    let id = required_text(obj.get("id")).ok_or("missing required field 'id'")?;
    let content = required_text(obj.get("content")).ok_or("missing required field 'content'")?;

    let title = match obj.get("title") {
        None | Some(Value::Null) => None,
        Some(Value::String(t)) => Some(t.as_str()),
        Some(_) => return Err("'title' must be a string".into()),
    };
    let title = match title {
        Some(t) if !t.trim().is_empty() => t.to_string(),
        _ => normalize_title(None),
    };

    let tags = match obj.get("tags") {
        None | Some(Value::Null) => None,
        Some(Value::Array(list)) => Some(
            list.iter()
                .map(|t| t.as_str().map(String::from))
                .collect::<Option<Vec<_>>>()
                .ok_or("'tags' must be a list of strings")?,
        ),
        Some(_) => return Err("'tags' must be a list of strings".into()),
    };

    let given_created = timestamp(obj.get("createdAt"), "createdAt")?;
    let given_updated = timestamp(obj.get("updatedAt"), "updatedAt")?;
    let created_at = given_created.or(given_updated).unwrap_or(now);
    let updated_at = given_updated
        .unwrap_or_else(|| now.max(created_at))
        .max(created_at);

    Ok(Prompt {
        id: id.to_string(),
        title,
        content: content.to_string(),
        tags: normalize_tags(tags),
        created_at,
        updated_at,
    })
}

fn required_text(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

#[allow(clippy::cast_possible_truncation)]
fn timestamp(value: Option<&Value>, field: &str) -> std::result::Result<Option<i64>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .map(Some)
            .ok_or_else(|| format!("'{field}' is out of range")),
        Some(_) => Err(format!("'{field}' must be a number")),
    }
}
