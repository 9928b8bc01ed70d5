//! Goal decomposition through the text-generation provider.

use neurocoach_core::{DecompositionRequest, SubgoalDraft};
use neurocoach_progress::retain_valid;
use tracing::{debug, warn};

use crate::error::Result;
use crate::generator::TextGenerator;
use crate::parse::parse_subgoal_drafts;
use crate::prompt::decomposition_messages;

/// Placeholder subgoals used when the provider fails or proposes nothing.
pub fn fallback_drafts() -> Vec<SubgoalDraft> {
    vec![
        SubgoalDraft::new("Planning", Some("Draw up a detailed plan for reaching the goal".into())),
        SubgoalDraft::new("First steps", Some("Identify and take the first actions".into())),
        SubgoalDraft::new("Checkpoint", Some("Review progress and adjust the plan".into())),
    ]
}

/// Asks a [`TextGenerator`] to split a goal into subgoals.
pub struct Decomposer<'a, G: TextGenerator + ?Sized> {
    generator: &'a G,
}

impl<'a, G: TextGenerator + ?Sized> Decomposer<'a, G> {
    /// Create a decomposer over a generator.
    pub fn new(generator: &'a G) -> Self {
        Self { generator }
    }

    /// Propose subgoals for a goal.
    ///
    /// Items without a usable title are dropped; the result may be empty.
    pub async fn decompose(&self, request: &DecompositionRequest) -> Result<Vec<SubgoalDraft>> {
        request.validate()?;

        let messages = decomposition_messages(request);
        let text = self.generator.complete(&messages).await?;
        let drafts = parse_subgoal_drafts(&text)?;

        let (valid, dropped) = retain_valid(drafts);
        if dropped > 0 {
            warn!(dropped, goal = %request.goal_title, "Dropped proposed subgoals without a title");
        }
        debug!(count = valid.len(), goal = %request.goal_title, "Decomposition proposed");
        Ok(valid)
    }
}
