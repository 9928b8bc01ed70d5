//! Coaching session model - transcript fed to the coach prompt.

use serde::{Deserialize, Serialize};

use crate::id::{SessionId, UserId};
use crate::Time;

/// A conversation with the coach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingSession {
    /// Unique identifier
    pub id: SessionId,

    /// Owner
    pub user_id: UserId,

    /// Kind of session
    pub session_type: SessionType,

    /// Title shown in lists
    pub title: String,

    /// Ordered messages
    #[serde(default)]
    pub transcript: Vec<SessionMessage>,

    /// User rating, 1-5
    #[serde(default)]
    pub rating: Option<u8>,

    /// Whether the session is still running
    pub status: SessionStatus,

    /// When created
    pub created_at: Time,

    /// When completed
    #[serde(default)]
    pub completed_at: Option<Time>,
}

impl CoachingSession {
    /// Start a new session.
    pub fn new(user_id: UserId, session_type: SessionType, title: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            user_id,
            session_type,
            title: title.into(),
            transcript: Vec::new(),
            rating: None,
            status: SessionStatus::Active,
            created_at: chrono::Utc::now(),
            completed_at: None,
        }
    }

    /// Append a message to the transcript.
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.transcript.push(SessionMessage {
            role,
            content: content.into(),
            sent_at: chrono::Utc::now(),
        });
    }

    /// Length of the session in whole minutes, if it has ended.
    pub fn duration_minutes(&self) -> Option<i64> {
        self.completed_at
            .map(|end| (end - self.created_at).num_minutes())
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    /// Author
    pub role: Role,
    /// Text
    pub content: String,
    /// When sent
    pub sent_at: Time,
}

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt
    System,
    /// The user
    User,
    /// The coach
    Assistant,
}

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Running
    Active,
    /// Ended
    Completed,
}

/// Session kinds offered by the coach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionType {
    /// Setting new goals
    GoalSetting,
    /// Reviewing progress
    ProgressReview,
    /// Working through a problem
    ProblemSolving,
    /// Emotional support
    EmotionalSupport,
    /// Anything else
    #[default]
    General,
}

impl SessionType {
    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            SessionType::GoalSetting => "goal setting",
            SessionType::ProgressReview => "progress review",
            SessionType::ProblemSolving => "problem solving",
            SessionType::EmotionalSupport => "emotional support",
            SessionType::General => "coaching",
        }
    }
}

impl std::str::FromStr for SessionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "goal-setting" => Ok(SessionType::GoalSetting),
            "progress-review" => Ok(SessionType::ProgressReview),
            "problem-solving" => Ok(SessionType::ProblemSolving),
            "emotional-support" => Ok(SessionType::EmotionalSupport),
            "general" => Ok(SessionType::General),
            other => Err(format!("unknown session type: {other}")),
        }
    }
}
