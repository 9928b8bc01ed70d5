//! AI Coaching
//!
//! Text-generation collaborator for NeuroCoach: goal decomposition with a
//! placeholder fallback, and the conversational coach.

#![warn(missing_docs)]

pub mod error;
pub mod config;
pub mod generator;
pub mod prompt;
pub mod parse;
pub mod decomposer;
pub mod coach;

pub use error::{AiError, Result};
pub use config::GeneratorConfig;
pub use generator::{ChatMessage, OpenAiGenerator, TextGenerator};
pub use parse::parse_subgoal_drafts;
pub use decomposer::{fallback_drafts, Decomposer};
pub use coach::GoalCoach;
