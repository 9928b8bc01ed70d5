//! Subgoal model - an ordered step of a goal.

use serde::{Deserialize, Serialize};

use crate::draft::SubgoalDraft;
use crate::id::{GoalId, SubgoalId};
use crate::Time;

/// A smaller step belonging to exactly one goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subgoal {
    /// Unique identifier
    pub id: SubgoalId,

    /// Owning goal
    pub goal_id: GoalId,

    /// Title
    pub title: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Current state
    pub status: SubgoalStatus,

    /// Display position within the goal
    pub order_index: u32,

    /// When created
    pub created_at: Time,

    /// Last updated
    pub updated_at: Time,
}

impl Subgoal {
    /// Materialize a validated draft at the given position.
    pub fn from_draft(goal_id: GoalId, draft: SubgoalDraft, order_index: u32) -> Self {
        let draft = draft.normalized();
        let now = chrono::Utc::now();
        Self {
            id: SubgoalId::new(),
            goal_id,
            title: draft.title,
            description: draft.description,
            status: SubgoalStatus::NotStarted,
            order_index,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Subgoal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubgoalStatus {
    /// Not started
    #[default]
    NotStarted,
    /// Started
    InProgress,
    /// Done
    Completed,
}

impl SubgoalStatus {
    /// Get string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            SubgoalStatus::NotStarted => "not_started",
            SubgoalStatus::InProgress => "in_progress",
            SubgoalStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for SubgoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubgoalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "not_started" | "todo" => Ok(SubgoalStatus::NotStarted),
            "in_progress" | "started" => Ok(SubgoalStatus::InProgress),
            "completed" | "done" => Ok(SubgoalStatus::Completed),
            other => Err(format!("unknown subgoal status: {other}")),
        }
    }
}

/// Sort subgoals into display order: `order_index`, then creation time.
pub fn sort_subgoals(subgoals: &mut [Subgoal]) {
    subgoals.sort_by(|a, b| {
        a.order_index
            .cmp(&b.order_index)
            .then(a.created_at.cmp(&b.created_at))
    });
}
