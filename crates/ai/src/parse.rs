//! Extracting subgoal drafts from free-form model output.
//!
//! Models wrap JSON in prose or code fences, so the payload is located with a
//! regex before parsing. Accepted shapes: a bare array, or an object holding
//! the array under `subGoals`, `subgoals` or `steps`.

use neurocoach_core::SubgoalDraft;
use regex::Regex;
use serde_json::Value;

use crate::error::{AiError, Result};

const LIST_KEYS: [&str; 3] = ["subGoals", "subgoals", "steps"];

/// Parse model output into raw drafts. Blank items are kept for the caller
/// to count and drop.
pub fn parse_subgoal_drafts(text: &str) -> Result<Vec<SubgoalDraft>> {
    let items = locate_list(text)?;
    Ok(items.iter().map(draft_from_value).collect())
}

fn locate_list(text: &str) -> Result<Vec<Value>> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        if let Some(items) = list_from_value(value) {
            return Ok(items);
        }
    }

    for pattern in [r"\{[\s\S]*\}", r"\[[\s\S]*\]"] {
        let re = Regex::new(pattern).map_err(|e| AiError::Parse(e.to_string()))?;
        if let Some(found) = re.find(text) {
            if let Ok(value) = serde_json::from_str::<Value>(found.as_str()) {
                if let Some(items) = list_from_value(value) {
                    return Ok(items);
                }
            }
        }
    }

    Err(AiError::Parse("no JSON list of subgoals in response".to_string()))
}

fn list_from_value(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => LIST_KEYS.iter().find_map(|key| match map.remove(*key) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        }),
        _ => None,
    }
}

fn draft_from_value(value: &Value) -> SubgoalDraft {
    match value {
        Value::String(title) => SubgoalDraft::new(title.clone(), None),
        Value::Object(map) => SubgoalDraft::new(
            map.get("title").and_then(Value::as_str).unwrap_or_default(),
            map.get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
        ),
        _ => SubgoalDraft::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_inside_prose() {
        let text = "Here is your plan:\n```json\n[\n  {\"title\": \"Research\", \"description\": \"Read two books\"},\n  {\"title\": \"Practice\"}\n]\n```\nGood luck!";
        let drafts = parse_subgoal_drafts(text).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].description.as_deref(), Some("Read two books"));
        assert_eq!(drafts[1].title, "Practice");
    }

    #[test]
    fn test_object_with_subgoals_key() {
        let text = r#"{"subGoals": [{"title": "Plan"}, "Execute"]}"#;
        let drafts = parse_subgoal_drafts(text).unwrap();
        assert_eq!(
            drafts,
            vec![SubgoalDraft::new("Plan", None), SubgoalDraft::new("Execute", None)]
        );
    }

    #[test]
    fn test_object_in_prose_with_lowercase_key() {
        let text = "Sure! {\"subgoals\": [{\"title\": \"Warm up\"}]} Hope that helps.";
        assert_eq!(parse_subgoal_drafts(text).unwrap().len(), 1);
    }

    #[test]
    fn test_unusable_items_become_blank_drafts() {
        let drafts = parse_subgoal_drafts(r#"[{"name": "no title"}, 42]"#).unwrap();
        assert_eq!(drafts.len(), 2);
        assert!(drafts.iter().all(|d| d.title.is_empty()));
    }

    #[test]
    fn test_empty_array_is_ok() {
        assert!(parse_subgoal_drafts("[]").unwrap().is_empty());
    }

    #[test]
    fn test_no_json_is_parse_error() {
        let err = parse_subgoal_drafts("I cannot help with that.").unwrap_err();
        assert!(matches!(err, AiError::Parse(_)));
    }
}
