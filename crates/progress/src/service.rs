//! Goal service: the single entry point the UI layers call.
//!
//! Every mutation follows the same order: load, apply in memory, write the
//! goal once, append a history entry when progress moved, then evaluate
//! achievement triggers against the stored state.

use neurocoach_core::{
    parse_rating, Achievement, CoachingSession, Goal, GoalDraft, GoalId, GoalPatch, GoalStatus,
    ProgressEntry, Role, SessionId, SessionStatus, SessionType, Subgoal, SubgoalDraft, SubgoalId,
    SubgoalStatus, UserId,
};
use neurocoach_storage::Storage;
use tracing::{debug, info};

use crate::achievements::AchievementEmitter;
use crate::analytics::AnalyticsSummary;
use crate::calculator::ProgressCalculator;
use crate::decomposition::build_replacement;
use crate::error::{ProgressError, Result};
use crate::lifecycle::{GoalLifecycle, ProgressOutcome};

/// Goal, subgoal and session operations over a storage backend.
pub struct GoalService<S: Storage> {
    storage: S,
    emitter: AchievementEmitter,
    earned: Vec<Achievement>,
}

impl<S: Storage> GoalService<S> {
    /// Create a service over the given storage.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            emitter: AchievementEmitter::new(),
            earned: Vec::new(),
        }
    }

    /// Underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Underlying storage, mutably.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Consume the service and return its storage.
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Achievements earned since the last call, oldest first.
    ///
    /// The UI drains this after each operation to show celebrations.
    pub fn take_earned(&mut self) -> Vec<Achievement> {
        std::mem::take(&mut self.earned)
    }

    // === Goals ===

    /// Create a goal and evaluate the goal-count achievements.
    pub async fn create_goal(&mut self, user_id: &UserId, draft: GoalDraft) -> Result<Goal> {
        draft.validate()?;
        let goal = Goal::new(user_id.clone(), draft);
        self.storage.save_goal(&goal).await?;
        info!(metric = "goal_created", goal = %goal.id, user = %user_id, "Goal created: {}", goal.title);

        let earned = self.emitter.goal_created(&mut self.storage, &goal).await?;
        self.earned.extend(earned);
        Ok(goal)
    }

    /// Load a goal.
    pub async fn goal(&self, id: GoalId) -> Result<Goal> {
        self.storage
            .load_goal(id)
            .await?
            .ok_or_else(|| ProgressError::NotFound(format!("goal {id}")))
    }

    /// List a user's goals, newest first.
    pub async fn list_goals(&self, user_id: &UserId) -> Result<Vec<Goal>> {
        Ok(self.storage.list_goals(user_id).await?)
    }

    /// Replace a goal's title, description, category, priority and target date.
    pub async fn edit_goal(&mut self, id: GoalId, draft: GoalDraft) -> Result<Goal> {
        draft.validate()?;
        let goal = self.goal(id).await?;
        GoalLifecycle::ensure_mutable(&goal)?;

        let draft = draft.normalized();
        let patch = GoalPatch {
            title: Some(draft.title),
            description: Some(draft.description),
            category: draft.category,
            priority: draft.priority,
            target_date: Some(draft.target_date),
        };
        Ok(self.storage.update_goal(id, patch).await?)
    }

    /// Delete a goal and its subgoals.
    pub async fn delete_goal(&mut self, id: GoalId) -> Result<()> {
        let goal = self.goal(id).await?;
        self.storage.delete_goal(id).await?;
        info!(goal = %id, "Goal deleted: {}", goal.title);
        Ok(())
    }

    /// A goal's subgoals in display order.
    pub async fn subgoals(&self, goal_id: GoalId) -> Result<Vec<Subgoal>> {
        Ok(self.storage.load_subgoals(goal_id).await?)
    }

    // === Progress triggers ===

    /// Recompute a goal's progress from its stored subgoals.
    ///
    /// Safe to call any number of times: an unchanged goal is not rewritten and
    /// no achievement is emitted twice. Calling it again after a failed
    /// achievement write records the missing achievement.
    pub async fn on_subgoals_changed(&mut self, goal_id: GoalId) -> Result<Goal> {
        let mut goal = self.goal(goal_id).await?;
        let subgoals = self.storage.load_subgoals(goal_id).await?;
        let outcome = GoalLifecycle::apply_subgoal_change(&mut goal, &subgoals)?;
        debug!(
            goal = %goal_id,
            subgoals = subgoals.len(),
            progress = goal.progress,
            changed = outcome.changed,
            "Recomputed progress"
        );
        self.commit(&goal, outcome).await?;
        Ok(goal)
    }

    /// Set a goal's progress by hand.
    ///
    /// On a goal with subgoals the value holds until the next subgoal change
    /// recomputes it. Completed goals must be reopened first.
    pub async fn on_manual_progress_set(&mut self, goal_id: GoalId, value: i64) -> Result<Goal> {
        let mut goal = self.goal(goal_id).await?;
        let outcome = GoalLifecycle::apply_manual_progress(&mut goal, value)?;
        self.commit(&goal, outcome).await?;
        Ok(goal)
    }

    /// Replace a goal's subgoals with a decomposition result.
    ///
    /// An empty result leaves the existing subgoals and progress untouched.
    pub async fn on_decomposition_result(
        &mut self,
        goal_id: GoalId,
        drafts: Vec<SubgoalDraft>,
    ) -> Result<Vec<Subgoal>> {
        let goal = self.goal(goal_id).await?;
        GoalLifecycle::ensure_mutable(&goal)?;
        if drafts.is_empty() {
            debug!(goal = %goal_id, "Empty decomposition, keeping current subgoals");
            return self.subgoals(goal_id).await;
        }

        let replacement = build_replacement(goal_id, drafts)?;
        let stored = self.storage.replace_subgoals(goal_id, replacement).await?;
        info!(goal = %goal_id, count = stored.len(), "Replaced subgoals from decomposition");

        self.on_subgoals_changed(goal_id).await?;
        Ok(stored)
    }

    // === Subgoals ===

    /// Append a subgoal and recompute the goal.
    pub async fn add_subgoal(
        &mut self,
        goal_id: GoalId,
        draft: SubgoalDraft,
    ) -> Result<(Subgoal, Goal)> {
        draft.validate()?;
        let goal = self.goal(goal_id).await?;
        GoalLifecycle::ensure_mutable(&goal)?;

        let existing = self.storage.load_subgoals(goal_id).await?;
        let order_index = existing
            .iter()
            .map(|s| s.order_index + 1)
            .max()
            .unwrap_or(0);
        let subgoal = Subgoal::from_draft(goal_id, draft, order_index);
        self.storage.save_subgoal(&subgoal).await?;

        let goal = self.on_subgoals_changed(goal_id).await?;
        Ok((subgoal, goal))
    }

    /// Change a subgoal's status and recompute its goal.
    pub async fn set_subgoal_status(
        &mut self,
        id: SubgoalId,
        status: SubgoalStatus,
    ) -> Result<(Subgoal, Goal)> {
        let mut subgoal = self.subgoal(id).await?;
        let goal = self.goal(subgoal.goal_id).await?;
        GoalLifecycle::ensure_mutable(&goal)?;

        if subgoal.status != status {
            subgoal.status = status;
            subgoal.updated_at = chrono::Utc::now();
            self.storage.save_subgoal(&subgoal).await?;
        }

        let goal = self.on_subgoals_changed(subgoal.goal_id).await?;
        Ok((subgoal, goal))
    }

    /// Flip a subgoal between completed and not started.
    pub async fn toggle_subgoal(&mut self, id: SubgoalId) -> Result<(Subgoal, Goal)> {
        let subgoal = self.subgoal(id).await?;
        let next = match subgoal.status {
            SubgoalStatus::Completed => SubgoalStatus::NotStarted,
            _ => SubgoalStatus::Completed,
        };
        self.set_subgoal_status(id, next).await
    }

    /// Change a subgoal's title and description.
    pub async fn rename_subgoal(&mut self, id: SubgoalId, draft: SubgoalDraft) -> Result<Subgoal> {
        draft.validate()?;
        let mut subgoal = self.subgoal(id).await?;
        let goal = self.goal(subgoal.goal_id).await?;
        GoalLifecycle::ensure_mutable(&goal)?;

        let draft = draft.normalized();
        subgoal.title = draft.title;
        subgoal.description = draft.description;
        subgoal.updated_at = chrono::Utc::now();
        self.storage.save_subgoal(&subgoal).await?;
        Ok(subgoal)
    }

    /// Delete a subgoal and recompute its goal.
    pub async fn delete_subgoal(&mut self, id: SubgoalId) -> Result<Goal> {
        let subgoal = self.subgoal(id).await?;
        let goal = self.goal(subgoal.goal_id).await?;
        GoalLifecycle::ensure_mutable(&goal)?;

        self.storage.delete_subgoal(id).await?;
        self.on_subgoals_changed(subgoal.goal_id).await
    }

    async fn subgoal(&self, id: SubgoalId) -> Result<Subgoal> {
        self.storage
            .load_subgoal(id)
            .await?
            .ok_or_else(|| ProgressError::NotFound(format!("subgoal {id}")))
    }

    // === Lifecycle ===

    /// Mark a goal completed and set its progress to 100.
    pub async fn complete_goal(&mut self, id: GoalId) -> Result<Goal> {
        self.change_status(id, GoalStatus::Completed).await
    }

    /// Pause a goal, keeping its progress.
    pub async fn pause_goal(&mut self, id: GoalId) -> Result<Goal> {
        self.change_status(id, GoalStatus::Paused).await
    }

    /// Resume a paused or not started goal.
    pub async fn resume_goal(&mut self, id: GoalId) -> Result<Goal> {
        self.change_status(id, GoalStatus::Active).await
    }

    /// Archive a goal. Archived goals reject further changes.
    pub async fn archive_goal(&mut self, id: GoalId) -> Result<Goal> {
        self.change_status(id, GoalStatus::Archived).await
    }

    /// Reopen a completed goal.
    ///
    /// With subgoals the progress is recomputed from them and `progress` is
    /// ignored; without subgoals `progress` replaces the stored 100.
    pub async fn reopen_goal(&mut self, id: GoalId, progress: Option<i64>) -> Result<Goal> {
        let mut goal = self.goal(id).await?;
        let subgoals = self.storage.load_subgoals(id).await?;
        let target = match ProgressCalculator::calculate(&subgoals) {
            Some(derived) => Some(derived),
            None => progress.map(neurocoach_core::parse_progress).transpose()?,
        };

        let from = goal.status;
        let outcome = GoalLifecycle::reopen(&mut goal, target)?;
        info!(goal = %id, from = %from, progress = goal.progress, "Goal reopened");
        self.commit(&goal, outcome).await?;
        Ok(goal)
    }

    async fn change_status(&mut self, id: GoalId, to: GoalStatus) -> Result<Goal> {
        let mut goal = self.goal(id).await?;
        let from = goal.status;
        let outcome = GoalLifecycle::transition(&mut goal, to)?;
        info!(goal = %id, from = %from, to = %to, "Goal status changed");
        self.commit(&goal, outcome).await?;
        Ok(goal)
    }

    /// Persist an applied outcome and run the progress triggers.
    ///
    /// An unchanged outcome writes nothing but still runs the triggers.
    async fn commit(&mut self, goal: &Goal, outcome: ProgressOutcome) -> Result<()> {
        if outcome.changed {
            self.storage.save_goal(goal).await?;

            if outcome.current != outcome.previous {
                let entry = ProgressEntry::new(goal.id, goal.user_id.clone(), outcome.current);
                self.storage.record_progress(&entry).await?;
                info!(
                    metric = "goal_progress",
                    goal = %goal.id,
                    from = outcome.previous,
                    to = outcome.current,
                    "Goal progress updated"
                );
            }
            if outcome.completed {
                info!(
                    metric = "goal_completed",
                    goal = %goal.id,
                    round = goal.completions,
                    "Goal completed: {}",
                    goal.title
                );
            }
        }

        let earned = self
            .emitter
            .progress_applied(&mut self.storage, goal, &outcome)
            .await?;
        self.earned.extend(earned);
        Ok(())
    }

    // === Sessions ===

    /// Start a coaching session. A blank title falls back to the type's label.
    pub async fn start_session(
        &mut self,
        user_id: &UserId,
        session_type: SessionType,
        title: &str,
    ) -> Result<CoachingSession> {
        let title = match title.trim() {
            "" => format!("New {} session", session_type.label()),
            t => t.to_string(),
        };
        let session = CoachingSession::new(user_id.clone(), session_type, title);
        self.storage.save_session(&session).await?;
        debug!(session = %session.id, kind = session_type.label(), "Session started");
        Ok(session)
    }

    /// Load a coaching session.
    pub async fn session(&self, id: SessionId) -> Result<CoachingSession> {
        self.storage
            .load_session(id)
            .await?
            .ok_or_else(|| ProgressError::NotFound(format!("session {id}")))
    }

    /// List a user's coaching sessions, newest first.
    pub async fn sessions(&self, user_id: &UserId) -> Result<Vec<CoachingSession>> {
        Ok(self.storage.list_sessions(user_id).await?)
    }

    /// Append a message to a running session.
    pub async fn record_message(
        &mut self,
        id: SessionId,
        role: Role,
        content: &str,
    ) -> Result<CoachingSession> {
        let mut session = self.session(id).await?;
        if session.status == SessionStatus::Completed {
            return Err(ProgressError::SessionClosed(id));
        }
        session.push(role, content);
        self.storage.save_session(&session).await?;
        Ok(session)
    }

    /// End a session, optionally rating it 1-5.
    ///
    /// Completing an already completed session only updates the rating.
    pub async fn complete_session(
        &mut self,
        id: SessionId,
        rating: Option<i64>,
    ) -> Result<CoachingSession> {
        let rating = rating.map(parse_rating).transpose()?;
        let mut session = self.session(id).await?;

        if rating.is_some() {
            session.rating = rating;
        }
        if session.status != SessionStatus::Completed {
            session.status = SessionStatus::Completed;
            session.completed_at = Some(chrono::Utc::now());
        }
        self.storage.save_session(&session).await?;
        info!(
            metric = "session_completed",
            session = %id,
            minutes = session.duration_minutes().unwrap_or(0),
            messages = session.transcript.len(),
            "Session completed"
        );

        let earned = self
            .emitter
            .session_completed(&mut self.storage, &session)
            .await?;
        self.earned.extend(earned);
        Ok(session)
    }

    // === Rewards & summary ===

    /// A user's achievements, newest first.
    pub async fn achievements(&self, user_id: &UserId) -> Result<Vec<Achievement>> {
        Ok(self.storage.list_achievements(user_id).await?)
    }

    /// A user's recorded progress values, oldest first, optionally for one goal.
    pub async fn progress_history(
        &self,
        user_id: &UserId,
        goal_id: Option<GoalId>,
    ) -> Result<Vec<ProgressEntry>> {
        Ok(self.storage.progress_history(user_id, goal_id).await?)
    }

    /// Dashboard numbers for a user.
    pub async fn analytics(&self, user_id: &UserId) -> Result<AnalyticsSummary> {
        let goals = self.storage.list_goals(user_id).await?;
        let sessions = self.storage.list_sessions(user_id).await?;
        let achievements = self.storage.list_achievements(user_id).await?;
        Ok(AnalyticsSummary::compute(&goals, &sessions, &achievements))
    }
}
