//! Achievement model - one-time celebratory records.

use serde::{Deserialize, Serialize};

use crate::id::{AchievementId, GoalId, SessionId, UserId};
use crate::Time;

/// A record granted once when a trigger condition is met.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    /// Unique identifier
    pub id: AchievementId,

    /// Owner
    pub user_id: UserId,

    /// What kind of event earned it
    pub kind: AchievementKind,

    /// Short title
    pub title: String,

    /// Longer description
    pub description: String,

    /// Emoji icon
    pub icon: String,

    /// Points awarded
    pub points: u32,

    /// Goal that triggered it
    #[serde(default)]
    pub goal_id: Option<GoalId>,

    /// Session that triggered it
    #[serde(default)]
    pub session_id: Option<SessionId>,

    /// Free-form context
    #[serde(default)]
    pub metadata: serde_json::Value,

    /// Uniqueness key per user
    pub dedup_key: DedupKey,

    /// When earned
    pub earned_at: Time,
}

impl Achievement {
    /// Create an achievement earned now.
    pub fn new(
        user_id: UserId,
        kind: AchievementKind,
        dedup_key: DedupKey,
        title: impl Into<String>,
        description: impl Into<String>,
        icon: impl Into<String>,
        points: u32,
    ) -> Self {
        Self {
            id: AchievementId::new(),
            user_id,
            kind,
            title: title.into(),
            description: description.into(),
            icon: icon.into(),
            points,
            goal_id: None,
            session_id: None,
            metadata: serde_json::Value::Object(Default::default()),
            dedup_key,
            earned_at: chrono::Utc::now(),
        }
    }

    /// Attach the triggering goal.
    pub fn with_goal(mut self, goal_id: GoalId) -> Self {
        self.goal_id = Some(goal_id);
        self
    }

    /// Attach the triggering session.
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Replace the metadata blob.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Achievement kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    /// The user's first goal
    FirstGoal,
    /// The user created a round number of goals
    GoalCreatedMilestone,
    /// A goal was completed
    GoalCompleted,
    /// A goal crossed 25/50/75%
    MilestoneReached,
    /// The user completed 3, 5 or 10 goals
    StreakAchieved,
    /// A coaching session was completed
    SessionCompleted,
}

impl AchievementKind {
    /// Get string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            AchievementKind::FirstGoal => "first_goal",
            AchievementKind::GoalCreatedMilestone => "goal_created_milestone",
            AchievementKind::GoalCompleted => "goal_completed",
            AchievementKind::MilestoneReached => "milestone_reached",
            AchievementKind::StreakAchieved => "streak_achieved",
            AchievementKind::SessionCompleted => "session_completed",
        }
    }
}

/// Identifies "the same" achievement for one user.
///
/// Serialized as a flat string so storage backends can index it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    /// One per title
    Title(String),
    /// One per goal completion round
    GoalCompleted {
        /// Goal
        goal_id: GoalId,
        /// Completion round, starting at 1
        round: u32,
    },
    /// One per goal and progress milestone
    Milestone {
        /// Goal
        goal_id: GoalId,
        /// 25, 50 or 75
        percent: u8,
    },
    /// One per session
    Session(SessionId),
}

impl std::fmt::Display for DedupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DedupKey::Title(title) => write!(f, "title:{title}"),
            DedupKey::GoalCompleted { goal_id, round } => {
                write!(f, "goal_completed:{goal_id}:{round}")
            }
            DedupKey::Milestone { goal_id, percent } => write!(f, "milestone:{goal_id}:{percent}"),
            DedupKey::Session(id) => write!(f, "session:{id}"),
        }
    }
}

impl std::str::FromStr for DedupKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || format!("malformed dedup key: {s}");
        let (tag, rest) = s.split_once(':').ok_or_else(bad)?;
        match tag {
            "title" => Ok(DedupKey::Title(rest.to_string())),
            "goal_completed" => {
                let (goal, round) = rest.split_once(':').ok_or_else(bad)?;
                Ok(DedupKey::GoalCompleted {
                    goal_id: goal.parse().map_err(|_| bad())?,
                    round: round.parse().map_err(|_| bad())?,
                })
            }
            "milestone" => {
                let (goal, percent) = rest.split_once(':').ok_or_else(bad)?;
                Ok(DedupKey::Milestone {
                    goal_id: goal.parse().map_err(|_| bad())?,
                    percent: percent.parse().map_err(|_| bad())?,
                })
            }
            "session" => Ok(DedupKey::Session(rest.parse().map_err(|_| bad())?)),
            _ => Err(bad()),
        }
    }
}

impl Serialize for DedupKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DedupKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_string_form() {
        let goal_id = GoalId::new();
        let key = DedupKey::Milestone { goal_id, percent: 50 };
        let text = key.to_string();
        assert_eq!(text, format!("milestone:{goal_id}:50"));
        assert_eq!(text.parse::<DedupKey>().unwrap(), key);
    }

    #[test]
    fn test_title_key_keeps_colons() {
        let key: DedupKey = "title:Level: expert".parse().unwrap();
        assert_eq!(key, DedupKey::Title("Level: expert".into()));
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        assert!("streak:3".parse::<DedupKey>().is_err());
    }
}
