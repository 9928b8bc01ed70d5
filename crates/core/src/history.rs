//! Progress history - one row per recorded progress change.

use serde::{Deserialize, Serialize};

use crate::id::{GoalId, UserId};
use crate::Time;

/// A goal's progress at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// Goal the value belongs to
    pub goal_id: GoalId,

    /// Owner of the goal
    pub user_id: UserId,

    /// Percentage complete (0-100)
    pub progress: u8,

    /// When the value was written
    pub recorded_at: Time,
}

impl ProgressEntry {
    /// Record a goal's progress as of now.
    pub fn new(goal_id: GoalId, user_id: UserId, progress: u8) -> Self {
        Self {
            goal_id,
            user_id,
            progress,
            recorded_at: chrono::Utc::now(),
        }
    }
}

/// Sort entries oldest first; ties keep insertion order.
pub fn sort_history(entries: &mut [ProgressEntry]) {
    entries.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
}
