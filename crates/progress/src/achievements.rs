//! Achievement triggers and idempotent emission.

use neurocoach_core::{
    Achievement, AchievementKind, CoachingSession, DedupKey, Goal, GoalStatus, UserId,
};
use neurocoach_storage::Storage;
use serde_json::json;
use tracing::{debug, info};

use crate::error::Result;
use crate::lifecycle::{ProgressOutcome, MILESTONES};

/// Title of the achievement for creating the first goal.
pub const FIRST_GOAL_TITLE: &str = "First goal";
/// Title of the achievement for creating five goals.
pub const GOAL_SETTER_TITLE: &str = "Goal-setter";

/// Evaluates trigger conditions and records achievements at most once.
#[derive(Debug, Clone, Copy, Default)]
pub struct AchievementEmitter;

impl AchievementEmitter {
    /// Create an emitter.
    pub fn new() -> Self {
        Self
    }

    /// Store an achievement unless its dedup key is already taken.
    ///
    /// Returns the stored row and whether it was created by this call.
    pub async fn emit<S: Storage + ?Sized>(
        &self,
        storage: &mut S,
        achievement: Achievement,
    ) -> Result<(Achievement, bool)> {
        if let Some(existing) = storage
            .find_achievement(&achievement.user_id, &achievement.dedup_key)
            .await?
        {
            debug!(key = %achievement.dedup_key, "Achievement already earned");
            return Ok((existing, false));
        }

        let stored = storage.create_achievement(&achievement).await?;
        let is_new = stored.id == achievement.id;
        if is_new {
            info!(
                metric = "achievement_earned",
                user = %stored.user_id,
                kind = stored.kind.as_str(),
                points = stored.points,
                "Achievement earned: {}",
                stored.title
            );
        }
        Ok((stored, is_new))
    }

    /// Triggers for a freshly created goal.
    pub async fn goal_created<S: Storage + ?Sized>(
        &self,
        storage: &mut S,
        goal: &Goal,
    ) -> Result<Vec<Achievement>> {
        let count = storage.count_goals(&goal.user_id).await?;
        let mut earned = Vec::new();
        let candidate = match count {
            1 => Some(first_goal(&goal.user_id)),
            5 => Some(goal_setter(&goal.user_id)),
            _ => None,
        };
        if let Some(achievement) = candidate {
            self.collect(storage, achievement, &mut earned).await?;
        }
        Ok(earned)
    }

    /// Triggers for a goal whose progress or status was just applied.
    ///
    /// Must run after the goal is saved so the completed-goal count includes it.
    /// An unchanged outcome re-checks the stored state instead, so a trigger
    /// whose write failed after the goal was saved is recorded on the next
    /// recompute; dedup keys keep the re-check from creating duplicates.
    pub async fn progress_applied<S: Storage + ?Sized>(
        &self,
        storage: &mut S,
        goal: &Goal,
        outcome: &ProgressOutcome,
    ) -> Result<Vec<Achievement>> {
        let mut earned = Vec::new();
        let recheck = !outcome.changed;

        let percent = if recheck {
            MILESTONES.contains(&goal.progress).then_some(goal.progress)
        } else {
            outcome.milestone()
        };
        if let Some(achievement) = percent.and_then(|p| milestone(goal, p)) {
            self.collect(storage, achievement, &mut earned).await?;
        }

        if outcome.completed || (recheck && goal.status == GoalStatus::Completed) {
            self.collect(storage, goal_completed(goal), &mut earned)
                .await?;

            let completed = storage.count_completed_goals(&goal.user_id).await?;
            if let Some(achievement) = streak(&goal.user_id, completed) {
                self.collect(storage, achievement, &mut earned).await?;
            }
        }

        Ok(earned)
    }

    /// Trigger for a coaching session that just ended.
    pub async fn session_completed<S: Storage + ?Sized>(
        &self,
        storage: &mut S,
        session: &CoachingSession,
    ) -> Result<Vec<Achievement>> {
        let mut earned = Vec::new();
        self.collect(storage, session_completed(session), &mut earned)
            .await?;
        Ok(earned)
    }

    async fn collect<S: Storage + ?Sized>(
        &self,
        storage: &mut S,
        achievement: Achievement,
        earned: &mut Vec<Achievement>,
    ) -> Result<()> {
        let (stored, is_new) = self.emit(storage, achievement).await?;
        if is_new {
            earned.push(stored);
        }
        Ok(())
    }
}

/// Achievement for the user's first goal.
pub fn first_goal(user_id: &UserId) -> Achievement {
    Achievement::new(
        user_id.clone(),
        AchievementKind::FirstGoal,
        DedupKey::Title(FIRST_GOAL_TITLE.to_string()),
        FIRST_GOAL_TITLE,
        "You created your first goal",
        "🎯",
        10,
    )
}

/// Achievement for the user's fifth goal.
pub fn goal_setter(user_id: &UserId) -> Achievement {
    Achievement::new(
        user_id.clone(),
        AchievementKind::GoalCreatedMilestone,
        DedupKey::Title(GOAL_SETTER_TITLE.to_string()),
        GOAL_SETTER_TITLE,
        "You created 5 goals",
        "🏆",
        25,
    )
}

/// Achievement for completing a goal, keyed by completion round.
pub fn goal_completed(goal: &Goal) -> Achievement {
    Achievement::new(
        goal.user_id.clone(),
        AchievementKind::GoalCompleted,
        DedupKey::GoalCompleted {
            goal_id: goal.id,
            round: goal.completions,
        },
        format!("Goal achieved: {}", goal.title),
        format!("You completed \"{}\". Keep it up!", goal.title),
        "🏆",
        50,
    )
    .with_goal(goal.id)
    .with_metadata(json!({
        "goal_title": goal.title,
        "completed_at": goal.completed_at,
        "round": goal.completions,
    }))
}

/// Achievement for landing on 25, 50 or 75 percent.
pub fn milestone(goal: &Goal, percent: u8) -> Option<Achievement> {
    let (label, icon) = match percent {
        25 => ("Quarter of the way", "🌱"),
        50 => ("Halfway there", "🌿"),
        75 => ("Almost there", "🌳"),
        _ => return None,
    };
    Some(
        Achievement::new(
            goal.user_id.clone(),
            AchievementKind::MilestoneReached,
            DedupKey::Milestone {
                goal_id: goal.id,
                percent,
            },
            format!("{}: {}", label, goal.title),
            format!("You reached {}% on \"{}\". Great work!", percent, goal.title),
            icon,
            u32::from(percent) / 5,
        )
        .with_goal(goal.id)
        .with_metadata(json!({ "goal_title": goal.title, "progress": percent })),
    )
}

/// Achievement for completing exactly 3, 5 or 10 goals.
pub fn streak(user_id: &UserId, completed: usize) -> Option<Achievement> {
    let (title, icon) = match completed {
        3 => ("Hat-trick", "🔥"),
        5 => ("Top five", "⭐"),
        10 => ("Perfect ten", "🌟"),
        _ => return None,
    };
    Some(
        Achievement::new(
            user_id.clone(),
            AchievementKind::StreakAchieved,
            DedupKey::Title(title.to_string()),
            title,
            format!("You completed {} goals. Impressive persistence!", completed),
            icon,
            completed as u32 * 10,
        )
        .with_metadata(json!({ "streak_count": completed })),
    )
}

/// Achievement for finishing a coaching session.
pub fn session_completed(session: &CoachingSession) -> Achievement {
    use neurocoach_core::SessionType::*;
    let icon = match session.session_type {
        GoalSetting => "🎯",
        ProgressReview => "📊",
        ProblemSolving => "🧩",
        EmotionalSupport => "🌈",
        General => "🔍",
    };
    Achievement::new(
        session.user_id.clone(),
        AchievementKind::SessionCompleted,
        DedupKey::Session(session.id),
        format!("Completed a {} session", session.session_type.label()),
        "New insights will help you reach your goals.",
        icon,
        20,
    )
    .with_session(session.id)
    .with_metadata(json!({ "session_type": session.session_type }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurocoach_core::{GoalDraft, SessionType};
    use neurocoach_storage::MemoryStorage;

    #[test]
    fn test_milestones_only_on_exact_values() {
        let goal = Goal::new(UserId::new("u1"), GoalDraft::new("Save money"));
        assert!(milestone(&goal, 25).is_some());
        assert!(milestone(&goal, 26).is_none());
        assert_eq!(milestone(&goal, 75).unwrap().points, 15);
    }

    #[test]
    fn test_streak_thresholds() {
        let user = UserId::new("u1");
        assert!(streak(&user, 2).is_none());
        assert_eq!(streak(&user, 3).unwrap().title, "Hat-trick");
        assert_eq!(streak(&user, 10).unwrap().points, 100);
        assert!(streak(&user, 11).is_none());
    }

    #[tokio::test]
    async fn test_emit_is_idempotent() {
        let mut storage = MemoryStorage::new();
        let emitter = AchievementEmitter::new();
        let user = UserId::new("u1");

        let (first, new_first) = emitter.emit(&mut storage, first_goal(&user)).await.unwrap();
        let (second, new_second) = emitter.emit(&mut storage, first_goal(&user)).await.unwrap();

        assert!(new_first);
        assert!(!new_second);
        assert_eq!(first.id, second.id);
        assert_eq!(storage.achievement_count(), 1);
    }

    #[tokio::test]
    async fn test_goal_completed_key_tracks_rounds() {
        let mut storage = MemoryStorage::new();
        let emitter = AchievementEmitter::new();
        let mut goal = Goal::new(UserId::new("u1"), GoalDraft::new("Ship it"));
        goal.status = GoalStatus::Completed;
        goal.completions = 1;

        emitter.emit(&mut storage, goal_completed(&goal)).await.unwrap();
        emitter.emit(&mut storage, goal_completed(&goal)).await.unwrap();
        goal.completions = 2;
        emitter.emit(&mut storage, goal_completed(&goal)).await.unwrap();

        assert_eq!(storage.achievement_count(), 2);
    }

    #[tokio::test]
    async fn test_session_completed_once_per_session() {
        let mut storage = MemoryStorage::new();
        let emitter = AchievementEmitter::new();
        let session = CoachingSession::new(UserId::new("u1"), SessionType::GoalSetting, "Kickoff");

        let first = emitter.session_completed(&mut storage, &session).await.unwrap();
        let again = emitter.session_completed(&mut storage, &session).await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].icon, "🎯");
        assert!(again.is_empty());
    }
}
