//! Storage trait abstraction.

use async_trait::async_trait;
use neurocoach_core::{
    Achievement, CoachingSession, DedupKey, Goal, GoalId, GoalPatch, GoalStatus, ProgressEntry,
    SessionId, Subgoal, SubgoalId, UserId,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database error
    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Persistence collaborator for the progress model.
///
/// Backends are interchangeable: the in-process [`MemoryStorage`], the
/// file-per-entity [`JsonStorage`] and, with the `sqlite` feature, the
/// relational `SqliteStorage`.
///
/// [`MemoryStorage`]: crate::MemoryStorage
/// [`JsonStorage`]: crate::JsonStorage
#[async_trait]
pub trait Storage: Send + Sync {
    // === Goal operations ===

    /// Save a goal (create or update).
    async fn save_goal(&mut self, goal: &Goal) -> Result<()>;

    /// Load a goal by ID.
    async fn load_goal(&self, id: GoalId) -> Result<Option<Goal>>;

    /// List a user's goals, newest first.
    async fn list_goals(&self, user_id: &UserId) -> Result<Vec<Goal>>;

    /// Delete a goal together with its subgoals and progress history.
    async fn delete_goal(&mut self, id: GoalId) -> Result<()>;

    /// Apply a partial update to a stored goal and return the result.
    async fn update_goal(&mut self, id: GoalId, patch: GoalPatch) -> Result<Goal> {
        let mut goal = self
            .load_goal(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("goal {id}")))?;
        goal.apply(patch);
        self.save_goal(&goal).await?;
        Ok(goal)
    }

    /// Number of goals the user owns, archived ones included.
    async fn count_goals(&self, user_id: &UserId) -> Result<usize> {
        Ok(self.list_goals(user_id).await?.len())
    }

    /// Number of the user's goals in the completed state.
    async fn count_completed_goals(&self, user_id: &UserId) -> Result<usize> {
        Ok(self
            .list_goals(user_id)
            .await?
            .iter()
            .filter(|g| g.status == GoalStatus::Completed)
            .count())
    }

    // === Subgoal operations ===

    /// Save a subgoal (create or update).
    async fn save_subgoal(&mut self, subgoal: &Subgoal) -> Result<()>;

    /// Load a subgoal by ID.
    async fn load_subgoal(&self, id: SubgoalId) -> Result<Option<Subgoal>>;

    /// Load a goal's subgoals in display order.
    async fn load_subgoals(&self, goal_id: GoalId) -> Result<Vec<Subgoal>>;

    /// Delete a subgoal.
    async fn delete_subgoal(&mut self, id: SubgoalId) -> Result<()>;

    /// Replace all subgoals of a goal in one step and return the new set.
    async fn replace_subgoals(
        &mut self,
        goal_id: GoalId,
        subgoals: Vec<Subgoal>,
    ) -> Result<Vec<Subgoal>>;

    // === Achievement operations ===

    /// Find an achievement by its dedup key.
    async fn find_achievement(
        &self,
        user_id: &UserId,
        key: &DedupKey,
    ) -> Result<Option<Achievement>>;

    /// Insert an achievement unless one with the same key exists.
    ///
    /// Returns the stored row: the new one, or the existing one on a duplicate.
    async fn create_achievement(&mut self, achievement: &Achievement) -> Result<Achievement>;

    /// List a user's achievements, newest first.
    async fn list_achievements(&self, user_id: &UserId) -> Result<Vec<Achievement>>;

    // === Progress history ===

    /// Append a progress history entry.
    async fn record_progress(&mut self, entry: &ProgressEntry) -> Result<()>;

    /// A user's progress history, oldest first, optionally for one goal.
    async fn progress_history(
        &self,
        user_id: &UserId,
        goal_id: Option<GoalId>,
    ) -> Result<Vec<ProgressEntry>>;

    // === Session operations ===

    /// Save a coaching session (create or update).
    async fn save_session(&mut self, session: &CoachingSession) -> Result<()>;

    /// Load a coaching session by ID.
    async fn load_session(&self, id: SessionId) -> Result<Option<CoachingSession>>;

    /// List a user's coaching sessions, newest first.
    async fn list_sessions(&self, user_id: &UserId) -> Result<Vec<CoachingSession>>;
}
