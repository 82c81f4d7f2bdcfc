//! Derived statistics for the stats and calendar views.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::occurrence::{is_due, DueDates};
use super::streak::{compute_streaks_from_days, StreakResult};
use super::Habit;
use crate::error::ValidationError;

/// Per-habit summary as of a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitStats {
    #[serde(flatten)]
    pub streaks: StreakResult,
    /// Completion records on or before `as_of`, due or not.
    pub total_completions: u32,
    pub due_occurrences: u32,
    pub completed_occurrences: u32,
    /// Percentage of due occurrences completed; 0 when nothing was due.
    pub completion_rate: f64,
}

/// One day of a habit's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarMark {
    pub date: NaiveDate,
    pub due: bool,
    pub completed: bool,
}

/// Share of due habits completed on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyProgress {
    pub date: NaiveDate,
    pub due: u32,
    pub completed: u32,
    pub rate: f64,
}

/// Longest progress window accepted, about a century.
pub const MAX_PROGRESS_DAYS: u32 = 36_600;

fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) * 100.0 / f64::from(whole)
    }
}

pub fn habit_stats(habit: &Habit, completions: &BTreeSet<NaiveDate>, as_of: NaiveDate) -> HabitStats {
    let streaks = compute_streaks_from_days(habit, completions, as_of);
    let mut due = 0u32;
    let mut completed = 0u32;
    for day in DueDates::new(habit, habit.created_at, as_of) {
        due += 1;
        if completions.contains(&day) {
            completed += 1;
        }
    }
    let total = completions.range(..=as_of).count() as u32;

    HabitStats {
        streaks,
        total_completions: total,
        due_occurrences: due,
        completed_occurrences: completed,
        completion_rate: percentage(completed, due),
    }
}

/// One mark per day in `[start, end]`; empty for an inverted range.
pub fn calendar_marks(
    habit: &Habit,
    completions: &BTreeSet<NaiveDate>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<CalendarMark> {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|date| CalendarMark {
            date,
            due: is_due(habit, date),
            completed: completions.contains(&date),
        })
        .collect()
}

/// Progress for the `days` days ending at `end`, oldest first.
///
/// Only habits due on a day count toward that day's total.
///
/// # Errors
/// [`ValidationError::InvalidValue`] when `days` exceeds
/// [`MAX_PROGRESS_DAYS`] or the window reaches past the earliest
/// representable date.
pub fn daily_progress(
    habits: &[(Habit, BTreeSet<NaiveDate>)],
    end: NaiveDate,
    days: u32,
) -> Result<Vec<DailyProgress>, ValidationError> {
    if days > MAX_PROGRESS_DAYS {
        return Err(ValidationError::InvalidValue {
            field: "days".into(),
            message: format!("{days} exceeds the {MAX_PROGRESS_DAYS}-day limit"),
        });
    }
    let Some(back) = days.checked_sub(1) else {
        return Ok(Vec::new());
    };
    let first = end
        .checked_sub_days(Days::new(u64::from(back)))
        .ok_or_else(|| ValidationError::InvalidValue {
            field: "days".into(),
            message: format!("a {days}-day window ending {end} starts before any valid date"),
        })?;

    Ok(first
        .iter_days()
        .take_while(|date| *date <= end)
        .map(|date| {
            let mut due = 0u32;
            let mut completed = 0u32;
            for (habit, done) in habits {
                if is_due(habit, date) {
                    due += 1;
                    if done.contains(&date) {
                        completed += 1;
                    }
                }
            }
            DailyProgress {
                date,
                due,
                completed,
                rate: percentage(completed, due),
            }
        })
        .collect())
}
