//! In-memory prompt search.

use crate::domain::Prompt;

/// Filter prompts by text and tags, keeping input order.
///
/// A prompt matches the tag filter when the filter is empty or the prompt
/// has any of the listed tags. It matches the query when the trimmed query
/// is empty or occurs, case-insensitively, in the title or the content.
#[must_use]
pub fn search(prompts: &[Prompt], query: &str, tags: &[String]) -> Vec<Prompt> {
    let query = query.trim().to_lowercase();

    prompts
        .iter()
        .filter(|p| tags.is_empty() || tags.iter().any(|t| p.has_tag(t)))
        .filter(|p| {
            query.is_empty()
                || p.title.to_lowercase().contains(&query)
                || p.content.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(id: &str, title: &str, content: &str, tags: &[&str]) -> Prompt {
        Prompt {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            tags: crate::domain::normalize_tags(Some(
                tags.iter().map(ToString::to_string).collect(),
            )),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn collection() -> Vec<Prompt> {
        vec![
            prompt("1", "Greeting", "Hello World", &["x"]),
            prompt("2", "Review", "Check this code", &["y"]),
            prompt("3", "Untagged", "plain text", &[]),
            prompt("4", "Both", "hello again", &["x", "y"]),
        ]
    }

    fn ids(prompts: &[Prompt]) -> Vec<&str> {
        prompts.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_empty_query_and_filter_returns_all_in_order() {
        let all = collection();
        assert_eq!(search(&all, "", &[]), all);
        assert_eq!(search(&all, "   ", &[]), all);
    }

    #[test]
    fn test_tag_filter() {
        let all = collection();
        assert_eq!(ids(&search(&all, "", &["x".into()])), vec!["1", "4"]);
        assert_eq!(
            ids(&search(&all, "", &["x".into(), "y".into()])),
            vec!["1", "2", "4"]
        );
        assert!(search(&all, "", &["missing".into()]).is_empty());
    }

    #[test]
    fn test_query_is_case_insensitive_substring() {
        let all = collection();
        assert_eq!(ids(&search(&all, "hello", &[])), vec!["1", "4"]);
        assert_eq!(ids(&search(&all, "REVIEW", &[])), vec!["2"]);
    }

    #[test]
    fn test_query_and_tags_combine() {
        let all = collection();
        assert_eq!(ids(&search(&all, "hello", &["y".into()])), vec!["4"]);
    }
}
