//! Turning decomposition drafts into a goal's new subgoal set.

use neurocoach_core::{GoalId, Subgoal, SubgoalDraft, ValidationResult};

/// Build the subgoals that replace a goal's current set.
///
/// Every draft must be valid; positions become `order_index` and every new
/// subgoal starts as not started.
pub fn build_replacement(goal_id: GoalId, drafts: Vec<SubgoalDraft>) -> ValidationResult<Vec<Subgoal>> {
    for draft in &drafts {
        draft.validate()?;
    }
    Ok(drafts
        .into_iter()
        .enumerate()
        .map(|(position, draft)| Subgoal::from_draft(goal_id, draft, position as u32))
        .collect())
}

/// Split proposed drafts into usable ones and a count of dropped ones.
///
/// Used for model output, where a blank item is noise rather than a user error.
pub fn retain_valid(drafts: Vec<SubgoalDraft>) -> (Vec<SubgoalDraft>, usize) {
    let total = drafts.len();
    let valid: Vec<SubgoalDraft> = drafts
        .into_iter()
        .map(SubgoalDraft::normalized)
        .filter(|d| d.validate().is_ok())
        .collect();
    let dropped = total - valid.len();
    (valid, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurocoach_core::{SubgoalStatus, ValidationError};

    #[test]
    fn test_replacement_is_ordered_and_not_started() {
        let goal_id = GoalId::new();
        let subgoals = build_replacement(
            goal_id,
            vec![
                SubgoalDraft::new("Research", None),
                SubgoalDraft::new("Prototype", Some("Build a first version".into())),
            ],
        )
        .unwrap();

        assert_eq!(subgoals.len(), 2);
        assert_eq!(subgoals[1].order_index, 1);
        assert_eq!(subgoals[1].description.as_deref(), Some("Build a first version"));
        assert!(subgoals.iter().all(|s| s.status == SubgoalStatus::NotStarted && s.goal_id == goal_id));
    }

    #[test]
    fn test_invalid_draft_rejects_the_whole_set() {
        let err = build_replacement(
            GoalId::new(),
            vec![SubgoalDraft::new("Fine", None), SubgoalDraft::new(" ", None)],
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::EmptyTitle("subgoal"));
    }

    #[test]
    fn test_retain_valid_counts_dropped() {
        let (valid, dropped) = retain_valid(vec![
            SubgoalDraft::new("Keep", None),
            SubgoalDraft::new("", None),
            SubgoalDraft::new("  ", Some("no title".into())),
        ]);
        assert_eq!(valid.len(), 1);
        assert_eq!(dropped, 2);
    }
}
