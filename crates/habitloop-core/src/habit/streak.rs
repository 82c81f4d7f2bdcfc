//! Streak calculator.
//!
//! Streaks are counted in due occurrences, not calendar days: a weekly
//! habit gains one per week. Results are never stored as a source of
//! truth; they are recomputed from the completion set on demand.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dates::parse_completion_set;
use super::occurrence::DueDates;
use super::Habit;

/// Current and longest streak of a habit.
///
/// `longest_streak >= current_streak` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakResult {
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Compute streaks from stored completion strings.
///
/// Malformed records are dropped; duplicates and ordering don't matter.
pub fn compute_streaks<I, S>(habit: &Habit, completions: I, as_of: NaiveDate) -> StreakResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    compute_streaks_from_days(habit, &parse_completion_set(completions), as_of)
}

/// Compute streaks as of `as_of` from already-parsed completion days.
///
/// An occurrence due on `as_of` that is not yet completed does not break
/// the current streak. A missed occurrence before `as_of` does.
pub fn compute_streaks_from_days(
    habit: &Habit,
    completions: &BTreeSet<NaiveDate>,
    as_of: NaiveDate,
) -> StreakResult {
    let occurrences: Vec<NaiveDate> = DueDates::new(habit, habit.created_at, as_of).collect();

    let mut longest = 0u32;
    let mut run = 0u32;
    for day in &occurrences {
        if completions.contains(day) {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }

    let mut pending = occurrences.as_slice();
    if let Some((last, earlier)) = pending.split_last() {
        if *last == as_of && !completions.contains(last) {
            pending = earlier;
        }
    }
    let current = pending
        .iter()
        .rev()
        .take_while(|day| completions.contains(day))
        .count() as u32;

    StreakResult {
        current_streak: current,
        longest_streak: longest,
    }
}
