//! Goal model - top-level objective with progress tracking.

use serde::{Deserialize, Serialize};

use crate::draft::GoalDraft;
use crate::id::{GoalId, UserId};
use crate::Time;

/// Category used when a draft does not name one.
pub const DEFAULT_CATEGORY: &str = "General";

/// A goal the user wants to achieve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Unique identifier
    pub id: GoalId,

    /// Owner
    pub user_id: UserId,

    /// Goal title
    pub title: String,

    /// Detailed description
    #[serde(default)]
    pub description: Option<String>,

    /// Free-text category
    pub category: String,

    /// Priority
    pub priority: Priority,

    /// Lifecycle status
    pub status: GoalStatus,

    /// Percentage complete (0-100)
    pub progress: u8,

    /// Optional target date
    #[serde(default)]
    pub target_date: Option<Time>,

    /// How many times the goal has transitioned to completed
    #[serde(default)]
    pub completions: u32,

    /// When the goal last became completed
    #[serde(default)]
    pub completed_at: Option<Time>,

    /// When created
    pub created_at: Time,

    /// Last updated
    pub updated_at: Time,
}

impl Goal {
    /// Create a new active goal from a validated draft.
    pub fn new(user_id: UserId, draft: GoalDraft) -> Self {
        let draft = draft.normalized();
        let now = chrono::Utc::now();
        Self {
            id: GoalId::new(),
            user_id,
            title: draft.title,
            description: draft.description,
            category: draft
                .category
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            priority: draft.priority.unwrap_or_default(),
            status: GoalStatus::Active,
            progress: 0,
            target_date: draft.target_date,
            completions: 0,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update and bump `updated_at`.
    pub fn apply(&mut self, patch: GoalPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(target_date) = patch.target_date {
            self.target_date = target_date;
        }
        self.updated_at = chrono::Utc::now();
    }

    /// Whether the goal counts toward active totals and progress averages.
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

/// Goal status.
///
/// Older records used `in_progress` and `on_hold` for the same states; both are
/// accepted when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Created but no progress recorded yet
    NotStarted,
    /// Being worked on
    #[serde(alias = "in_progress")]
    Active,
    /// Put aside by the user
    #[serde(alias = "on_hold")]
    Paused,
    /// Done
    Completed,
    /// Soft-deleted
    Archived,
}

impl GoalStatus {
    /// Not started or active.
    pub fn is_open(self) -> bool {
        matches!(self, GoalStatus::NotStarted | GoalStatus::Active)
    }

    /// Get string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            GoalStatus::NotStarted => "not_started",
            GoalStatus::Active => "active",
            GoalStatus::Paused => "paused",
            GoalStatus::Completed => "completed",
            GoalStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "not_started" => Ok(GoalStatus::NotStarted),
            "active" | "in_progress" => Ok(GoalStatus::Active),
            "paused" | "on_hold" => Ok(GoalStatus::Paused),
            "completed" => Ok(GoalStatus::Completed),
            "archived" => Ok(GoalStatus::Archived),
            other => Err(format!("unknown goal status: {other}")),
        }
    }
}

/// Goal priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low
    Low,
    /// Medium
    #[default]
    Medium,
    /// High
    High,
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Partial update of a goal's details; `None` leaves a field untouched.
///
/// Status and progress change only through the lifecycle controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalPatch {
    /// New title
    pub title: Option<String>,
    /// New description (`Some(None)` clears it)
    pub description: Option<Option<String>>,
    /// New category
    pub category: Option<String>,
    /// New priority
    pub priority: Option<Priority>,
    /// New target date (`Some(None)` clears it)
    pub target_date: Option<Option<Time>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_goal_is_active_at_zero() {
        let goal = Goal::new(UserId::new("u1"), GoalDraft::new("  Run a marathon "));
        assert_eq!(goal.title, "Run a marathon");
        assert_eq!(goal.status, GoalStatus::Active);
        assert_eq!(goal.progress, 0);
        assert_eq!(goal.category, DEFAULT_CATEGORY);
        assert_eq!(goal.priority, Priority::Medium);
    }

    #[test]
    fn test_legacy_status_names_map_to_canonical() {
        let s: GoalStatus = serde_json::from_str("\"on_hold\"").unwrap();
        assert_eq!(s, GoalStatus::Paused);
        let s: GoalStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(s, GoalStatus::Active);
        assert_eq!(serde_json::to_string(&GoalStatus::NotStarted).unwrap(), "\"not_started\"");
    }

    #[test]
    fn test_patch_touches_only_given_fields() {
        let mut goal = Goal::new(UserId::new("u1"), GoalDraft::new("Read"));
        goal.apply(GoalPatch {
            category: Some("Health".into()),
            ..Default::default()
        });
        assert_eq!(goal.category, "Health");
        assert_eq!(goal.title, "Read");
    }
}
