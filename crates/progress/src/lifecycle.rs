//! Goal status transitions and progress application.
//!
//! Everything here mutates a `Goal` in memory; the caller writes the result
//! back in one save so progress and status are never observed apart.

use neurocoach_core::{parse_progress, Goal, GoalStatus, Subgoal, ValidationError};

use crate::calculator::ProgressCalculator;
use crate::error::{ProgressError, Result};

/// Milestones that earn an achievement when progress lands on them exactly.
pub const MILESTONES: [u8; 3] = [25, 50, 75];

/// What applying a progress value did to a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressOutcome {
    /// Progress before the change
    pub previous: u8,
    /// Progress after the change
    pub current: u8,
    /// Status before the change
    pub previous_status: GoalStatus,
    /// The goal transitioned to completed in this step
    pub completed: bool,
    /// Anything about the goal changed
    pub changed: bool,
}

impl ProgressOutcome {
    fn unchanged(goal: &Goal) -> Self {
        Self {
            previous: goal.progress,
            current: goal.progress,
            previous_status: goal.status,
            completed: false,
            changed: false,
        }
    }

    /// The milestone progress landed on, if it moved onto one.
    pub fn milestone(&self) -> Option<u8> {
        (self.current != self.previous && MILESTONES.contains(&self.current))
            .then_some(self.current)
    }
}

/// Goal lifecycle controller.
pub struct GoalLifecycle;

impl GoalLifecycle {
    /// Whether an explicit status change is allowed.
    pub fn can_transition(from: GoalStatus, to: GoalStatus) -> bool {
        use GoalStatus::*;
        match (from, to) {
            // Start working
            (NotStarted, Active) => true,
            // Finish
            (NotStarted | Active | Paused, Completed) => true,
            // Reopen
            (Completed, Active) => true,
            // Pause and resume
            (NotStarted | Active, Paused) => true,
            (Paused, Active) => true,
            // Soft delete
            (NotStarted | Active | Paused | Completed, Archived) => true,
            _ => false,
        }
    }

    /// Apply an explicit status change requested by the user.
    ///
    /// Completing sets progress to 100. Reopening keeps the current progress,
    /// which must then be below 100; use [`reopen`](Self::reopen) to pick a value.
    pub fn transition(goal: &mut Goal, to: GoalStatus) -> Result<ProgressOutcome> {
        Self::ensure_mutable(goal)?;
        if !Self::can_transition(goal.status, to) {
            return Err(ProgressError::InvalidTransition {
                goal_id: goal.id,
                from: goal.status,
                to,
            });
        }

        match to {
            GoalStatus::Completed => Ok(Self::complete(goal)),
            GoalStatus::Active if goal.status == GoalStatus::Completed => {
                Self::reopen(goal, None)
            }
            _ => {
                let mut outcome = ProgressOutcome::unchanged(goal);
                goal.status = to;
                goal.updated_at = chrono::Utc::now();
                outcome.changed = true;
                Ok(outcome)
            }
        }
    }

    /// Move a completed goal back to active.
    ///
    /// `progress` overrides the stored value; either way the result must be
    /// below 100 so the goal does not immediately complete again.
    pub fn reopen(goal: &mut Goal, progress: Option<u8>) -> Result<ProgressOutcome> {
        Self::ensure_mutable(goal)?;
        if goal.status != GoalStatus::Completed {
            return Err(ProgressError::InvalidTransition {
                goal_id: goal.id,
                from: goal.status,
                to: GoalStatus::Active,
            });
        }
        let target = progress.unwrap_or(goal.progress);
        if target >= 100 {
            return Err(ValidationError::ReopenAtFullProgress(target).into());
        }

        let mut outcome = ProgressOutcome::unchanged(goal);
        goal.status = GoalStatus::Active;
        goal.progress = target;
        goal.completed_at = None;
        goal.updated_at = chrono::Utc::now();
        outcome.current = target;
        outcome.changed = true;
        Ok(outcome)
    }

    /// Recompute progress after the goal's subgoals changed.
    ///
    /// An empty subgoal list leaves the goal untouched.
    pub fn apply_subgoal_change(goal: &mut Goal, subgoals: &[Subgoal]) -> Result<ProgressOutcome> {
        Self::ensure_mutable(goal)?;
        match ProgressCalculator::calculate(subgoals) {
            Some(progress) => Ok(Self::apply_progress(goal, progress)),
            None => Ok(ProgressOutcome::unchanged(goal)),
        }
    }

    /// Set progress by hand.
    ///
    /// A completed goal only accepts 100; lower values go through
    /// [`reopen`](Self::reopen) so the status follows the progress.
    pub fn apply_manual_progress(goal: &mut Goal, value: i64) -> Result<ProgressOutcome> {
        let progress = parse_progress(value)?;
        Self::ensure_mutable(goal)?;
        if goal.status == GoalStatus::Completed && progress < 100 {
            return Err(ProgressError::ReopenRequired(goal.id));
        }
        Ok(Self::apply_progress(goal, progress))
    }

    /// Write a progress value, completing the goal when it reaches 100.
    fn apply_progress(goal: &mut Goal, progress: u8) -> ProgressOutcome {
        if progress == 100 && goal.status != GoalStatus::Completed {
            return Self::complete(goal);
        }

        let mut outcome = ProgressOutcome::unchanged(goal);
        if goal.progress != progress {
            goal.progress = progress;
            outcome.current = progress;
            outcome.changed = true;
        }
        if goal.status == GoalStatus::NotStarted && progress > 0 {
            goal.status = GoalStatus::Active;
            outcome.changed = true;
        }
        if outcome.changed {
            goal.updated_at = chrono::Utc::now();
        }
        outcome
    }

    fn complete(goal: &mut Goal) -> ProgressOutcome {
        let mut outcome = ProgressOutcome::unchanged(goal);
        let now = chrono::Utc::now();
        goal.status = GoalStatus::Completed;
        goal.progress = 100;
        goal.completed_at = Some(now);
        goal.completions += 1;
        goal.updated_at = now;
        outcome.current = 100;
        outcome.completed = true;
        outcome.changed = true;
        outcome
    }

    pub(crate) fn ensure_mutable(goal: &Goal) -> Result<()> {
        if goal.status == GoalStatus::Archived {
            Err(ProgressError::Archived(goal.id))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurocoach_core::{GoalDraft, SubgoalDraft, SubgoalStatus, UserId};

    fn goal() -> Goal {
        Goal::new(UserId::new("u1"), GoalDraft::new("Get fit"))
    }

    fn subgoals(goal: &Goal, statuses: &[SubgoalStatus]) -> Vec<Subgoal> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let mut s = Subgoal::from_draft(goal.id, SubgoalDraft::new(format!("Step {}", i), None), i as u32);
                s.status = *status;
                s
            })
            .collect()
    }

    #[test]
    fn test_subgoal_change_sets_progress_and_stays_active() {
        use SubgoalStatus::*;
        let mut g = goal();
        let subs = subgoals(&g, &[Completed, Completed, NotStarted, NotStarted]);

        let outcome = GoalLifecycle::apply_subgoal_change(&mut g, &subs).unwrap();

        assert_eq!(g.progress, 50);
        assert_eq!(g.status, GoalStatus::Active);
        assert_eq!(outcome.milestone(), Some(50));
        assert!(!outcome.completed);
    }

    #[test]
    fn test_empty_subgoals_leave_manual_progress_alone() {
        let mut g = goal();
        g.progress = 40;
        let outcome = GoalLifecycle::apply_subgoal_change(&mut g, &[]).unwrap();
        assert_eq!(g.progress, 40);
        assert!(!outcome.changed);
    }

    #[test]
    fn test_reaching_hundred_completes_once() {
        let mut g = goal();
        let subs = subgoals(&g, &[SubgoalStatus::Completed; 4]);

        let first = GoalLifecycle::apply_subgoal_change(&mut g, &subs).unwrap();
        assert!(first.completed);
        assert_eq!(g.status, GoalStatus::Completed);
        assert!(g.completed_at.is_some());
        assert_eq!(g.completions, 1);

        let replay = GoalLifecycle::apply_subgoal_change(&mut g, &subs).unwrap();
        assert!(!replay.completed);
        assert!(!replay.changed);
        assert_eq!(g.completions, 1);
    }

    #[test]
    fn test_paused_goal_completes_at_hundred() {
        let mut g = goal();
        GoalLifecycle::transition(&mut g, GoalStatus::Paused).unwrap();
        GoalLifecycle::apply_manual_progress(&mut g, 100).unwrap();
        assert_eq!(g.status, GoalStatus::Completed);
    }

    #[test]
    fn test_manual_progress_validation() {
        let mut g = goal();
        let err = GoalLifecycle::apply_manual_progress(&mut g, 101).unwrap_err();
        assert!(matches!(
            err,
            ProgressError::Validation(ValidationError::ProgressOutOfRange(101))
        ));
        assert_eq!(g.progress, 0);
    }

    #[test]
    fn test_manual_progress_on_completed_goal_needs_reopen() {
        let mut g = goal();
        GoalLifecycle::transition(&mut g, GoalStatus::Completed).unwrap();

        let err = GoalLifecycle::apply_manual_progress(&mut g, 30).unwrap_err();
        assert!(matches!(err, ProgressError::ReopenRequired(_)));
        assert_eq!(g.status, GoalStatus::Completed);
        assert_eq!(g.progress, 100);

        let outcome = GoalLifecycle::apply_manual_progress(&mut g, 100).unwrap();
        assert!(!outcome.changed);
        assert_eq!(g.completions, 1);
    }

    #[test]
    fn test_not_started_goal_becomes_active_with_progress() {
        let mut g = goal();
        g.status = GoalStatus::NotStarted;
        GoalLifecycle::apply_manual_progress(&mut g, 10).unwrap();
        assert_eq!(g.status, GoalStatus::Active);
    }

    #[test]
    fn test_pause_and_resume_preserve_progress() {
        let mut g = goal();
        GoalLifecycle::apply_manual_progress(&mut g, 60).unwrap();
        GoalLifecycle::transition(&mut g, GoalStatus::Paused).unwrap();
        GoalLifecycle::transition(&mut g, GoalStatus::Active).unwrap();
        assert_eq!(g.progress, 60);
        assert_eq!(g.status, GoalStatus::Active);
    }

    #[test]
    fn test_reopen_requires_progress_below_hundred() {
        let mut g = goal();
        GoalLifecycle::transition(&mut g, GoalStatus::Completed).unwrap();
        assert_eq!(g.progress, 100);

        let err = GoalLifecycle::transition(&mut g, GoalStatus::Active).unwrap_err();
        assert!(matches!(
            err,
            ProgressError::Validation(ValidationError::ReopenAtFullProgress(100))
        ));

        GoalLifecycle::reopen(&mut g, Some(80)).unwrap();
        assert_eq!(g.status, GoalStatus::Active);
        assert_eq!(g.progress, 80);
        assert!(g.completed_at.is_none());
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let mut g = goal();
        let err = GoalLifecycle::transition(&mut g, GoalStatus::Active).unwrap_err();
        assert!(matches!(err, ProgressError::InvalidTransition { .. }));

        GoalLifecycle::transition(&mut g, GoalStatus::Archived).unwrap();
        let err = GoalLifecycle::transition(&mut g, GoalStatus::Active).unwrap_err();
        assert!(matches!(err, ProgressError::Archived(_)));
        let err = GoalLifecycle::apply_manual_progress(&mut g, 10).unwrap_err();
        assert!(matches!(err, ProgressError::Archived(_)));
    }

    #[test]
    fn test_transition_table() {
        use GoalStatus::*;
        assert!(GoalLifecycle::can_transition(Completed, Archived));
        assert!(!GoalLifecycle::can_transition(Paused, Paused));
        assert!(!GoalLifecycle::can_transition(Completed, Paused));
        assert!(!GoalLifecycle::can_transition(Archived, Active));
        assert!(!GoalLifecycle::can_transition(Active, NotStarted));
    }
}
