//! Progress Tracking
//!
//! Goal progress derived from subgoals, the goal lifecycle, and the
//! achievements earned along the way.

#![warn(missing_docs)]

pub mod error;
pub mod calculator;
pub mod lifecycle;
pub mod achievements;
pub mod decomposition;
pub mod analytics;
pub mod service;

pub use error::{ProgressError, Result};
pub use calculator::ProgressCalculator;
pub use lifecycle::{GoalLifecycle, ProgressOutcome, MILESTONES};
pub use achievements::AchievementEmitter;
pub use decomposition::{build_replacement, retain_valid};
pub use analytics::AnalyticsSummary;
pub use service::GoalService;
