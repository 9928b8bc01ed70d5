//! NeuroCoach core data models.
//!
//! This crate defines the goals, subgoals, achievements and coaching sessions
//! shared by the progress model, the storage backends and the AI layer.

#![warn(missing_docs)]

// Core identities
mod id;

// Goal management
mod goal;
mod subgoal;

// Rewards and coaching
mod achievement;
mod session;
mod history;

// Boundary schemas
mod draft;

// Re-exports
pub use id::*;

// Goal & Subgoal
pub use goal::{Goal, GoalPatch, GoalStatus, Priority, DEFAULT_CATEGORY};
pub use subgoal::{sort_subgoals, Subgoal, SubgoalStatus};

// Achievements, Sessions & History
pub use achievement::{Achievement, AchievementKind, DedupKey};
pub use session::{CoachingSession, Role, SessionMessage, SessionStatus, SessionType};
pub use history::{sort_history, ProgressEntry};

// Validation
pub use draft::{
    parse_progress, parse_rating, DecompositionRequest, GoalDraft, SubgoalDraft,
    ValidationError, ValidationResult, MAX_TITLE_LEN,
};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
