//! Goal progress derived from subgoal states.

use neurocoach_core::{Subgoal, SubgoalStatus};

/// Derives a goal's completion percentage from its subgoals.
///
/// Completed subgoals weigh 1, in-progress ones 0.5, not-started ones 0. The
/// mean is scaled to 100 and rounded half away from zero. The arithmetic is
/// done on half-units so the result never depends on float rounding.
pub struct ProgressCalculator;

impl ProgressCalculator {
    /// Progress for a goal with these subgoals.
    ///
    /// `None` for an empty list: without subgoals the stored value stays
    /// authoritative.
    pub fn calculate(subgoals: &[Subgoal]) -> Option<u8> {
        Self::from_statuses(subgoals.iter().map(|s| s.status))
    }

    /// Same as [`calculate`](Self::calculate), from bare statuses.
    pub fn from_statuses<I>(statuses: I) -> Option<u8>
    where
        I: IntoIterator<Item = SubgoalStatus>,
    {
        let mut count: u64 = 0;
        let mut half_units: u64 = 0;
        for status in statuses {
            count += 1;
            half_units += Self::half_units(status);
        }
        if count == 0 {
            return None;
        }
        // round(100 * half_units / (2 * count)), half away from zero
        let percent = (100 * half_units + count) / (2 * count);
        Some(percent.min(100) as u8)
    }

    fn half_units(status: SubgoalStatus) -> u64 {
        match status {
            SubgoalStatus::Completed => 2,
            SubgoalStatus::InProgress => 1,
            SubgoalStatus::NotStarted => 0,
        }
    }
}
