//! In-process storage.
//!
//! Keeps everything in hash maps. Used by tests and by callers that hold the
//! data somewhere else and only need the progress model.

use std::collections::HashMap;

use async_trait::async_trait;
use neurocoach_core::{
    sort_history, sort_subgoals, Achievement, CoachingSession, DedupKey, Goal, GoalId,
    ProgressEntry, SessionId, Subgoal, SubgoalId, UserId,
};

use super::{Result, Storage};

/// Hash-map backed storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    goals: HashMap<GoalId, Goal>,
    subgoals: HashMap<SubgoalId, Subgoal>,
    achievements: Vec<Achievement>,
    history: Vec<ProgressEntry>,
    sessions: HashMap<SessionId, CoachingSession>,
}

impl MemoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored achievements across all users.
    pub fn achievement_count(&self) -> usize {
        self.achievements.len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save_goal(&mut self, goal: &Goal) -> Result<()> {
        self.goals.insert(goal.id, goal.clone());
        Ok(())
    }

    async fn load_goal(&self, id: GoalId) -> Result<Option<Goal>> {
        Ok(self.goals.get(&id).cloned())
    }

    async fn list_goals(&self, user_id: &UserId) -> Result<Vec<Goal>> {
        let mut goals: Vec<Goal> = self
            .goals
            .values()
            .filter(|g| &g.user_id == user_id)
            .cloned()
            .collect();
        goals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(goals)
    }

    async fn delete_goal(&mut self, id: GoalId) -> Result<()> {
        self.goals.remove(&id);
        self.subgoals.retain(|_, s| s.goal_id != id);
        self.history.retain(|e| e.goal_id != id);
        Ok(())
    }

    async fn save_subgoal(&mut self, subgoal: &Subgoal) -> Result<()> {
        self.subgoals.insert(subgoal.id, subgoal.clone());
        Ok(())
    }

    async fn load_subgoal(&self, id: SubgoalId) -> Result<Option<Subgoal>> {
        Ok(self.subgoals.get(&id).cloned())
    }

    async fn load_subgoals(&self, goal_id: GoalId) -> Result<Vec<Subgoal>> {
        let mut subgoals: Vec<Subgoal> = self
            .subgoals
            .values()
            .filter(|s| s.goal_id == goal_id)
            .cloned()
            .collect();
        sort_subgoals(&mut subgoals);
        Ok(subgoals)
    }

    async fn delete_subgoal(&mut self, id: SubgoalId) -> Result<()> {
        self.subgoals.remove(&id);
        Ok(())
    }

    async fn replace_subgoals(
        &mut self,
        goal_id: GoalId,
        subgoals: Vec<Subgoal>,
    ) -> Result<Vec<Subgoal>> {
        self.subgoals.retain(|_, s| s.goal_id != goal_id);
        for subgoal in &subgoals {
            self.subgoals.insert(subgoal.id, subgoal.clone());
        }
        self.load_subgoals(goal_id).await
    }

    async fn find_achievement(
        &self,
        user_id: &UserId,
        key: &DedupKey,
    ) -> Result<Option<Achievement>> {
        Ok(self
            .achievements
            .iter()
            .find(|a| &a.user_id == user_id && &a.dedup_key == key)
            .cloned())
    }

    async fn create_achievement(&mut self, achievement: &Achievement) -> Result<Achievement> {
        if let Some(existing) = self
            .find_achievement(&achievement.user_id, &achievement.dedup_key)
            .await?
        {
            return Ok(existing);
        }
        self.achievements.push(achievement.clone());
        Ok(achievement.clone())
    }

    async fn list_achievements(&self, user_id: &UserId) -> Result<Vec<Achievement>> {
        let mut achievements: Vec<Achievement> = self
            .achievements
            .iter()
            .filter(|a| &a.user_id == user_id)
            .cloned()
            .collect();
        achievements.sort_by(|a, b| b.earned_at.cmp(&a.earned_at));
        Ok(achievements)
    }

    async fn record_progress(&mut self, entry: &ProgressEntry) -> Result<()> {
        self.history.push(entry.clone());
        Ok(())
    }

    async fn progress_history(
        &self,
        user_id: &UserId,
        goal_id: Option<GoalId>,
    ) -> Result<Vec<ProgressEntry>> {
        let mut entries: Vec<ProgressEntry> = self
            .history
            .iter()
            .filter(|e| &e.user_id == user_id && goal_id.map_or(true, |id| e.goal_id == id))
            .cloned()
            .collect();
        sort_history(&mut entries);
        Ok(entries)
    }

    async fn save_session(&mut self, session: &CoachingSession) -> Result<()> {
        self.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn load_session(&self, id: SessionId) -> Result<Option<CoachingSession>> {
        Ok(self.sessions.get(&id).cloned())
    }

    async fn list_sessions(&self, user_id: &UserId) -> Result<Vec<CoachingSession>> {
        let mut sessions: Vec<CoachingSession> = self
            .sessions
            .values()
            .filter(|s| &s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurocoach_core::{AchievementKind, GoalDraft, GoalPatch, SubgoalDraft};

    #[tokio::test]
    async fn test_delete_goal_cascades_to_subgoals() {
        let mut storage = MemoryStorage::new();
        let goal = Goal::new(UserId::new("u1"), GoalDraft::new("Learn piano"));
        storage.save_goal(&goal).await.unwrap();
        let sub = Subgoal::from_draft(goal.id, SubgoalDraft::new("Scales", None), 0);
        storage.save_subgoal(&sub).await.unwrap();

        storage.delete_goal(goal.id).await.unwrap();

        assert!(storage.load_goal(goal.id).await.unwrap().is_none());
        assert!(storage.load_subgoal(sub.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_progress_history_filters_by_goal() {
        let mut storage = MemoryStorage::new();
        let user = UserId::new("u1");
        let first = GoalId::new();
        let second = GoalId::new();
        storage.record_progress(&ProgressEntry::new(first, user.clone(), 25)).await.unwrap();
        storage.record_progress(&ProgressEntry::new(second, user.clone(), 10)).await.unwrap();
        storage.record_progress(&ProgressEntry::new(first, user.clone(), 50)).await.unwrap();
        storage
            .record_progress(&ProgressEntry::new(first, UserId::new("u2"), 90))
            .await
            .unwrap();

        let all = storage.progress_history(&user, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let values: Vec<u8> = storage
            .progress_history(&user, Some(first))
            .await
            .unwrap()
            .iter()
            .map(|e| e.progress)
            .collect();
        assert_eq!(values, [25, 50]);

        storage.delete_goal(first).await.unwrap();
        assert_eq!(storage.progress_history(&user, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_goal_reports_missing_goal() {
        let mut storage = MemoryStorage::new();
        let err = storage
            .update_goal(GoalId::new(), GoalPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_achievement_returns_first() {
        let mut storage = MemoryStorage::new();
        let user = UserId::new("u1");
        let key = DedupKey::Title("First goal".into());
        let first = Achievement::new(user.clone(), AchievementKind::FirstGoal, key.clone(), "First goal", "", "🎯", 10);
        let second = Achievement::new(user.clone(), AchievementKind::FirstGoal, key, "First goal", "", "🎯", 10);

        let a = storage.create_achievement(&first).await.unwrap();
        let b = storage.create_achievement(&second).await.unwrap();

        assert_eq!(a.id, b.id);
        assert_eq!(storage.achievement_count(), 1);
    }
}
