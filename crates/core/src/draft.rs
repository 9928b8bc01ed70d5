//! Boundary schemas for incoming payloads and their validation.
//!
//! Every operation that accepts user or model supplied data takes one of these
//! drafts and calls `validate()` before anything reaches the progress model.

use serde::{Deserialize, Serialize};

use crate::goal::Priority;
use crate::Time;

/// Longest accepted goal or subgoal title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Malformed input rejected at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Title missing or blank
    #[error("{0} title must not be empty")]
    EmptyTitle(&'static str),

    /// Title exceeds [`MAX_TITLE_LEN`]
    #[error("{what} title is {len} characters long, the limit is {max}")]
    TitleTooLong {
        /// Which entity the title belongs to
        what: &'static str,
        /// Actual length
        len: usize,
        /// Allowed length
        max: usize,
    },

    /// Progress outside 0..=100
    #[error("progress must be between 0 and 100, got {0}")]
    ProgressOutOfRange(i64),

    /// Session rating outside 1..=5
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i64),

    /// Blank chat message
    #[error("message must not be empty")]
    EmptyMessage,

    /// A completed goal cannot be reopened at 100%
    #[error("reopening a goal requires progress below 100, got {0}")]
    ReopenAtFullProgress(u8),
}

/// Result alias for validation.
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

pub(crate) fn validate_title(what: &'static str, title: &str) -> ValidationResult<()> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle(what));
    }
    let len = trimmed.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong {
            what,
            len,
            max: MAX_TITLE_LEN,
        });
    }
    Ok(())
}

/// Check a progress value and narrow it to a percentage.
pub fn parse_progress(value: i64) -> ValidationResult<u8> {
    if (0..=100).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ValidationError::ProgressOutOfRange(value))
    }
}

/// Check a session rating.
pub fn parse_rating(value: i64) -> ValidationResult<u8> {
    if (1..=5).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ValidationError::RatingOutOfRange(value))
    }
}

fn normalize_optional(text: Option<String>) -> Option<String> {
    text.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Payload for creating a goal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalDraft {
    /// Goal title
    pub title: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Free-text category
    #[serde(default)]
    pub category: Option<String>,
    /// Priority, medium when absent
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Optional target date
    #[serde(default)]
    pub target_date: Option<Time>,
}

impl GoalDraft {
    /// Create a draft with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Validate the draft.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_title("goal", &self.title)
    }

    /// Trim text fields and drop blank optionals.
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: normalize_optional(self.description),
            category: normalize_optional(self.category),
            ..self
        }
    }
}

/// Payload for one subgoal, typed by a user or proposed by decomposition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubgoalDraft {
    /// Subgoal title
    pub title: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

impl SubgoalDraft {
    /// Create a draft.
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description,
        }
    }

    /// Validate the draft.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_title("subgoal", &self.title)
    }

    /// Trim text fields and drop a blank description.
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: normalize_optional(self.description),
        }
    }
}

/// Payload asking the text-generation provider to decompose a goal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecompositionRequest {
    /// Title of the goal to decompose
    pub goal_title: String,
    /// Optional goal description
    #[serde(default)]
    pub goal_description: Option<String>,
    /// Subgoals already present, so the provider does not repeat them
    #[serde(default, alias = "existingSubGoals")]
    pub existing: Vec<SubgoalDraft>,
}

impl DecompositionRequest {
    /// Validate the request.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_title("goal", &self.goal_title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_titles_are_rejected() {
        assert_eq!(
            GoalDraft::new("   ").validate(),
            Err(ValidationError::EmptyTitle("goal"))
        );
        assert_eq!(
            SubgoalDraft::new("", None).validate(),
            Err(ValidationError::EmptyTitle("subgoal"))
        );
    }

    #[test]
    fn test_long_title_is_rejected() {
        let draft = GoalDraft::new("x".repeat(MAX_TITLE_LEN + 1));
        assert!(matches!(
            draft.validate(),
            Err(ValidationError::TitleTooLong { len: 201, .. })
        ));
    }

    #[test]
    fn test_progress_bounds() {
        assert_eq!(parse_progress(0), Ok(0));
        assert_eq!(parse_progress(100), Ok(100));
        assert_eq!(parse_progress(101), Err(ValidationError::ProgressOutOfRange(101)));
        assert_eq!(parse_progress(-1), Err(ValidationError::ProgressOutOfRange(-1)));
    }

    #[test]
    fn test_normalized_draft_drops_blank_description() {
        let draft = SubgoalDraft::new("  Read a book ", Some("  ".into())).normalized();
        assert_eq!(draft.title, "Read a book");
        assert_eq!(draft.description, None);
    }

    #[test]
    fn test_decomposition_request_accepts_legacy_field_names() {
        let req: DecompositionRequest = serde_json::from_value(json!({
            "goalTitle": "Learn Spanish",
            "existingSubGoals": [{"title": "Buy a textbook"}]
        }))
        .unwrap();
        assert_eq!(req.existing.len(), 1);
        assert!(req.validate().is_ok());
    }
}
