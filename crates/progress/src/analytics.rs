//! Per-user progress summary.

use neurocoach_core::{Achievement, CoachingSession, Goal, GoalStatus};
use serde::Serialize;

/// Aggregate numbers shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    /// All goals, archived included
    pub total_goals: usize,
    /// Not started or active goals
    pub active_goals: usize,
    /// Completed goals
    pub completed_goals: usize,
    /// Paused goals
    pub paused_goals: usize,
    /// Archived goals
    pub archived_goals: usize,
    /// Coaching sessions
    pub total_sessions: usize,
    /// Mean progress of active goals, rounded
    pub avg_progress: u8,
    /// Mean session rating to one decimal, 0 without rated sessions
    pub avg_rating: f64,
    /// Sum of achievement points
    pub total_points: u32,
}

impl AnalyticsSummary {
    /// Compute the summary.
    pub fn compute(
        goals: &[Goal],
        sessions: &[CoachingSession],
        achievements: &[Achievement],
    ) -> Self {
        let count = |status: GoalStatus| goals.iter().filter(|g| g.status == status).count();

        let open: Vec<&Goal> = goals.iter().filter(|g| g.is_open()).collect();
        let avg_progress = if open.is_empty() {
            0
        } else {
            let n = open.len() as u64;
            let sum: u64 = open.iter().map(|g| u64::from(g.progress)).sum();
            ((2 * sum + n) / (2 * n)) as u8
        };

        let ratings: Vec<u8> = sessions.iter().filter_map(|s| s.rating).collect();
        let avg_rating = if ratings.is_empty() {
            0.0
        } else {
            let mean = ratings.iter().map(|&r| f64::from(r)).sum::<f64>() / ratings.len() as f64;
            (mean * 10.0).round() / 10.0
        };

        Self {
            total_goals: goals.len(),
            active_goals: open.len(),
            completed_goals: count(GoalStatus::Completed),
            paused_goals: count(GoalStatus::Paused),
            archived_goals: count(GoalStatus::Archived),
            total_sessions: sessions.len(),
            avg_progress,
            avg_rating,
            total_points: achievements.iter().map(|a| a.points).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurocoach_core::{GoalDraft, SessionType, UserId};

    fn goal(status: GoalStatus, progress: u8) -> Goal {
        let mut g = Goal::new(UserId::new("u1"), GoalDraft::new("G"));
        g.status = status;
        g.progress = progress;
        g
    }

    #[test]
    fn test_archived_goals_are_excluded_from_average() {
        let goals = vec![
            goal(GoalStatus::Active, 30),
            goal(GoalStatus::Active, 45),
            goal(GoalStatus::Archived, 0),
            goal(GoalStatus::Completed, 100),
        ];
        let summary = AnalyticsSummary::compute(&goals, &[], &[]);
        assert_eq!(summary.total_goals, 4);
        assert_eq!(summary.active_goals, 2);
        assert_eq!(summary.archived_goals, 1);
        assert_eq!(summary.completed_goals, 1);
        // 37.5 rounds up
        assert_eq!(summary.avg_progress, 38);
    }

    #[test]
    fn test_rating_average_ignores_unrated_sessions() {
        let user = UserId::new("u1");
        let mut a = CoachingSession::new(user.clone(), SessionType::General, "a");
        a.rating = Some(4);
        let mut b = CoachingSession::new(user.clone(), SessionType::General, "b");
        b.rating = Some(5);
        let c = CoachingSession::new(user, SessionType::General, "c");

        let summary = AnalyticsSummary::compute(&[], &[a, b, c], &[]);
        assert_eq!(summary.total_sessions, 3);
        assert_eq!(summary.avg_rating, 4.5);
        assert_eq!(summary.avg_progress, 0);
    }
}
