//! Coach orchestration: decomposition and chat on top of the goal service.

use neurocoach_core::{
    DecompositionRequest, GoalId, GoalStatus, Role, SessionId, SessionStatus, Subgoal,
    SubgoalDraft, ValidationError,
};
use neurocoach_progress::{GoalService, ProgressError};
use neurocoach_storage::Storage;
use tracing::{info, warn};

use crate::decomposer::{fallback_drafts, Decomposer};
use crate::error::Result;
use crate::generator::TextGenerator;
use crate::prompt::{coach_messages, coach_system_prompt};

/// Goal service paired with a text generator.
pub struct GoalCoach<S: Storage, G: TextGenerator> {
    service: GoalService<S>,
    generator: G,
}

impl<S: Storage, G: TextGenerator> GoalCoach<S, G> {
    /// Create a coach.
    pub fn new(service: GoalService<S>, generator: G) -> Self {
        Self { service, generator }
    }

    /// The wrapped goal service.
    pub fn service(&self) -> &GoalService<S> {
        &self.service
    }

    /// The wrapped goal service, mutably.
    pub fn service_mut(&mut self) -> &mut GoalService<S> {
        &mut self.service
    }

    /// Release the goal service.
    pub fn into_service(self) -> GoalService<S> {
        self.service
    }

    /// Replace a goal's subgoals with a fresh decomposition.
    ///
    /// Provider failures and empty proposals fall back to three placeholder
    /// subgoals, so the user always ends up with a plan.
    pub async fn decompose_goal(&mut self, goal_id: GoalId) -> Result<Vec<Subgoal>> {
        let goal = self.service.goal(goal_id).await?;
        if goal.status == GoalStatus::Archived {
            return Err(ProgressError::Archived(goal_id).into());
        }

        let existing = self.service.subgoals(goal_id).await?;
        let request = DecompositionRequest {
            goal_title: goal.title.clone(),
            goal_description: goal.description.clone(),
            existing: existing
                .iter()
                .map(|s| SubgoalDraft::new(s.title.clone(), s.description.clone()))
                .collect(),
        };

        let drafts = match Decomposer::new(&self.generator).decompose(&request).await {
            Ok(drafts) if !drafts.is_empty() => drafts,
            Ok(_) => {
                warn!(goal = %goal_id, "Decomposition proposed no subgoals, using fallback");
                fallback_drafts()
            }
            Err(e) if e.is_upstream() => {
                warn!(goal = %goal_id, error = %e, "Decomposition failed, using fallback");
                fallback_drafts()
            }
            Err(e) => return Err(e),
        };

        Ok(self.service.on_decomposition_result(goal_id, drafts).await?)
    }

    /// Answer a user message within a coaching session.
    ///
    /// The exchange is recorded only after the provider replies.
    pub async fn coach_reply(&mut self, session_id: SessionId, message: &str) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }

        let session = self.service.session(session_id).await?;
        if session.status == SessionStatus::Completed {
            return Err(ProgressError::SessionClosed(session_id).into());
        }

        let mut context = Vec::new();
        for goal in self.service.list_goals(&session.user_id).await? {
            if goal.is_open() {
                let subgoals = self.service.subgoals(goal.id).await?;
                context.push((goal, subgoals));
            }
        }

        let system = coach_system_prompt(&context);
        let messages = coach_messages(&system, &session.transcript, message);
        let reply = self.generator.complete(&messages).await?;
        let reply = reply.trim().to_string();

        self.service
            .record_message(session_id, Role::User, message)
            .await?;
        self.service
            .record_message(session_id, Role::Assistant, &reply)
            .await?;
        info!(session = %session_id, goals = context.len(), "Coach replied");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AiError;
    use crate::generator::ScriptedGenerator;
    use neurocoach_core::{GoalDraft, SessionType, SubgoalStatus, UserId};
    use neurocoach_storage::{JsonStorage, MemoryStorage};

    fn user() -> UserId {
        UserId::new("u1")
    }

    async fn coach_with(
        replies: Vec<std::result::Result<&str, &str>>,
    ) -> (GoalCoach<MemoryStorage, ScriptedGenerator>, GoalId) {
        let mut service = GoalService::new(MemoryStorage::new());
        let goal = service
            .create_goal(&user(), GoalDraft::new("Learn Spanish"))
            .await
            .unwrap();
        (GoalCoach::new(service, ScriptedGenerator::new(replies)), goal.id)
    }

    #[tokio::test]
    async fn test_decomposition_replaces_subgoals() {
        let (mut coach, goal_id) =
            coach_with(vec![Ok(r#"[{"title": "Vocabulary"}, {"title": "Grammar"}]"#)]).await;
        coach
            .service_mut()
            .add_subgoal(goal_id, SubgoalDraft::new("Old step", None))
            .await
            .unwrap();

        let subgoals = coach.decompose_goal(goal_id).await.unwrap();

        let titles: Vec<&str> = subgoals.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Vocabulary", "Grammar"]);
        let prompts = coach.generator.prompts.lock().unwrap();
        assert!(prompts[0][1].content.contains("- Old step"));
    }

    #[tokio::test]
    async fn test_empty_proposal_uses_placeholders() {
        let (mut coach, goal_id) = coach_with(vec![Ok("[]")]).await;

        let subgoals = coach.decompose_goal(goal_id).await.unwrap();

        assert_eq!(subgoals.len(), 3);
        assert!(subgoals.iter().all(|s| s.status == SubgoalStatus::NotStarted));
        let goal = coach.service().goal(goal_id).await.unwrap();
        assert_eq!(goal.progress, 0);
    }

    #[tokio::test]
    async fn test_provider_failure_uses_placeholders() {
        let (mut coach, goal_id) = coach_with(vec![Err("timeout")]).await;
        let subgoals = coach.decompose_goal(goal_id).await.unwrap();
        assert_eq!(subgoals[2].title, "Checkpoint");
    }

    #[tokio::test]
    async fn test_archived_goal_is_not_sent_to_provider() {
        let (mut coach, goal_id) = coach_with(vec![Ok("[]")]).await;
        coach.service_mut().archive_goal(goal_id).await.unwrap();

        let err = coach.decompose_goal(goal_id).await.unwrap_err();

        assert!(matches!(err, AiError::Progress(ProgressError::Archived(_))));
        assert_eq!(coach.generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_coach_reply_records_exchange() {
        let (mut coach, _) = coach_with(vec![Ok(" What is one word you could learn today? ")]).await;
        let session = coach
            .service_mut()
            .start_session(&user(), SessionType::GoalSetting, "Kickoff")
            .await
            .unwrap();

        let reply = coach.coach_reply(session.id, "I keep procrastinating").await.unwrap();

        assert_eq!(reply, "What is one word you could learn today?");
        let session = coach.service().session(session.id).await.unwrap();
        assert_eq!(session.transcript.len(), 2);
        assert_eq!(session.transcript[0].role, Role::User);
        let prompts = coach.generator.prompts.lock().unwrap();
        assert!(prompts[0][0].content.contains("Learn Spanish (0% complete, active)"));
    }

    #[tokio::test]
    async fn test_failed_reply_records_nothing() {
        let (mut coach, _) = coach_with(vec![Err("503")]).await;
        let session = coach
            .service_mut()
            .start_session(&user(), SessionType::General, "")
            .await
            .unwrap();

        assert!(coach.coach_reply(session.id, "hello").await.is_err());
        assert!(matches!(
            coach.coach_reply(session.id, "   ").await,
            Err(AiError::Validation(ValidationError::EmptyMessage))
        ));

        let session = coach.service().session(session.id).await.unwrap();
        assert!(session.transcript.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_on_json_storage() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(temp_dir.path()).await.unwrap();
        let mut service = GoalService::new(storage);
        let goal = service
            .create_goal(&user(), GoalDraft::new("Write a novel"))
            .await
            .unwrap();
        let mut coach = GoalCoach::new(service, ScriptedGenerator::new(vec![Ok("no idea")]));

        coach.decompose_goal(goal.id).await.unwrap();

        let storage = JsonStorage::new(temp_dir.path()).await.unwrap();
        assert_eq!(storage.load_subgoals(goal.id).await.unwrap().len(), 3);
    }
}
