//! Service facade used by request handlers and the CLI.
//!
//! Owns a store and a clock. Every write returns freshly recomputed
//! streaks; nothing is served from a cache. Failures are logged with the
//! habit id and operation before they are returned.

use std::collections::BTreeSet;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result, ValidationError};
use crate::habit::dates::{format_day, parse_completion_set, parse_day};
use crate::habit::{
    calendar_marks, compute_streaks_from_days, daily_progress, habit_stats, is_due,
    validate_name, CalendarMark, DailyProgress, Habit, HabitStats, HabitUpdate, NewHabit,
    StreakResult,
};
use crate::storage::Store;

/// Source of "today" in the caller's local calendar.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// A habit on a day's agenda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaEntry {
    pub habit: Habit,
    pub is_completed: bool,
    #[serde(flatten)]
    pub streaks: StreakResult,
}

fn logged<T>(operation: &'static str, habit_id: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        if e.is_client_error() {
            tracing::warn!(habit_id, operation, error = %e, "habit operation rejected");
        } else {
            tracing::error!(habit_id, operation, error = %e, "habit operation failed");
        }
    }
    result
}

fn parse_optional_day(value: Option<&str>, default: NaiveDate) -> Result<NaiveDate> {
    value.map_or(Ok(default), parse_day)
}

pub struct HabitTracker<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S: Store> HabitTracker<S, SystemClock> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: SystemClock,
        }
    }
}

impl<S: Store, C: Clock> HabitTracker<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Habit-id operations limited to `owner_id`'s habits, or to every
    /// habit when `None`.
    pub fn scoped<'a>(&'a self, owner_id: Option<&'a str>) -> OwnerScope<'a, S, C> {
        OwnerScope {
            tracker: self,
            owner_id,
        }
    }

    fn completion_days(&self, habit_id: &str) -> Result<BTreeSet<NaiveDate>> {
        Ok(parse_completion_set(self.store.list_completions(habit_id)?))
    }

    pub fn create_habit(&self, new: NewHabit) -> Result<Habit> {
        let habit_id = Uuid::new_v4().to_string();
        let result = (|| -> Result<Habit> {
            let habit = Habit {
                id: habit_id.clone(),
                owner_id: new.owner_id,
                name: validate_name(&new.name)?,
                description: new.description.filter(|d| !d.trim().is_empty()),
                frequency: new.frequency,
                time_of_day: new.time_of_day,
                scheduled_time: new.scheduled_time.filter(|t| !t.trim().is_empty()),
                created_at: new.created_at.unwrap_or_else(|| self.today()),
                rule_history: Vec::new(),
            };
            self.store.insert_habit(&habit)?;
            tracing::info!(
                habit_id = %habit.id,
                owner_id = %habit.owner_id,
                frequency = %habit.frequency,
                "habit created"
            );
            Ok(habit)
        })();
        logged("create_habit", &habit_id, result)
    }

    pub fn get_habit(&self, habit_id: &str) -> Result<Habit> {
        self.scoped(None).get_habit(habit_id)
    }

    pub fn list_habits(&self, owner_id: Option<&str>) -> Result<Vec<Habit>> {
        logged("list_habits", "-", self.store.list_habits(owner_id))
    }

    /// Edit name, description, frequency or grouping. A frequency change
    /// applies from today on; earlier due dates are left as they were.
    pub fn update_habit(&self, habit_id: &str, update: HabitUpdate) -> Result<Habit> {
        self.scoped(None).update_habit(habit_id, update)
    }

    pub fn delete_habit(&self, habit_id: &str) -> Result<()> {
        self.scoped(None).delete_habit(habit_id)
    }

    /// Flip `date` in the habit's completion set and return the new streaks
    /// as of today.
    ///
    /// # Errors
    /// [`CoreError::InvalidDate`](crate::CoreError::InvalidDate) for an
    /// unparsable `date`, [`CoreError::NotFound`](crate::CoreError::NotFound)
    /// for an unknown habit.
    pub fn toggle_completion(&self, habit_id: &str, date: &str) -> Result<StreakResult> {
        self.scoped(None).toggle_completion(habit_id, date)
    }

    /// Read-only streak recomputation; `as_of` defaults to today.
    pub fn get_streaks(&self, habit_id: &str, as_of: Option<&str>) -> Result<StreakResult> {
        self.scoped(None).get_streaks(habit_id, as_of)
    }

    /// Whether `habit` should show on `date` (default today).
    pub fn is_due_today(&self, habit: &Habit, date: Option<&str>) -> Result<bool> {
        let result = parse_optional_day(date, self.today()).map(|day| is_due(habit, day));
        logged("is_due_today", &habit.id, result)
    }

    pub fn habit_stats(&self, habit_id: &str, as_of: Option<&str>) -> Result<HabitStats> {
        self.scoped(None).habit_stats(habit_id, as_of)
    }

    /// Habits due on `date`, grouped by part of day, then by scheduled
    /// time, then by name. Habits without a group or time sort last.
    pub fn agenda(&self, owner_id: Option<&str>, date: Option<&str>) -> Result<Vec<AgendaEntry>> {
        let result = (|| -> Result<Vec<AgendaEntry>> {
            let day = parse_optional_day(date, self.today())?;
            let mut entries = Vec::new();
            for habit in self.store.list_habits(owner_id)? {
                if !is_due(&habit, day) {
                    continue;
                }
                let done = self.completion_days(&habit.id)?;
                entries.push(AgendaEntry {
                    is_completed: done.contains(&day),
                    streaks: compute_streaks_from_days(&habit, &done, day),
                    habit,
                });
            }
            entries.sort_by(|a, b| {
                let (a, b) = (&a.habit, &b.habit);
                a.time_of_day
                    .is_none()
                    .cmp(&b.time_of_day.is_none())
                    .then_with(|| a.time_of_day.cmp(&b.time_of_day))
                    .then_with(|| a.scheduled_time.is_none().cmp(&b.scheduled_time.is_none()))
                    .then_with(|| a.scheduled_time.cmp(&b.scheduled_time))
                    .then_with(|| a.name.cmp(&b.name))
            });
            Ok(entries)
        })();
        logged("agenda", "-", result)
    }

    pub fn calendar(&self, habit_id: &str, start: &str, end: &str) -> Result<Vec<CalendarMark>> {
        self.scoped(None).calendar(habit_id, start, end)
    }

    /// Completion share of due habits for each of the `days` days ending
    /// at `end` (default today).
    pub fn progress(
        &self,
        owner_id: Option<&str>,
        end: Option<&str>,
        days: u32,
    ) -> Result<Vec<DailyProgress>> {
        let result = (|| -> Result<Vec<DailyProgress>> {
            let end = parse_optional_day(end, self.today())?;
            let habits = self
                .store
                .list_habits(owner_id)?
                .into_iter()
                .map(|habit| -> Result<(Habit, BTreeSet<NaiveDate>)> {
                    let done = self.completion_days(&habit.id)?;
                    Ok((habit, done))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(daily_progress(&habits, end, days)?)
        })();
        logged("progress", "-", result)
    }
}

/// Habit-id operations seen from one owner.
///
/// A habit that belongs to another owner is reported as
/// [`CoreError::NotFound`](crate::CoreError::NotFound), exactly like a
/// missing one.
pub struct OwnerScope<'a, S, C = SystemClock> {
    tracker: &'a HabitTracker<S, C>,
    owner_id: Option<&'a str>,
}

impl<S: Store, C: Clock> OwnerScope<'_, S, C> {
    fn habit(&self, habit_id: &str) -> Result<Habit> {
        let habit = self.tracker.store.get_habit(habit_id)?;
        match self.owner_id {
            Some(owner) if owner != habit.owner_id => Err(CoreError::not_found(habit_id)),
            _ => Ok(habit),
        }
    }

    pub fn get_habit(&self, habit_id: &str) -> Result<Habit> {
        logged("get_habit", habit_id, self.habit(habit_id))
    }

    pub fn update_habit(&self, habit_id: &str, update: HabitUpdate) -> Result<Habit> {
        let result = (|| -> Result<Habit> {
            let mut habit = self.habit(habit_id)?;
            if update.is_empty() {
                return Ok(habit);
            }
            update.apply_to(&mut habit, self.tracker.today())?;
            self.tracker.store.update_habit(&habit)?;
            Ok(habit)
        })();
        logged("update_habit", habit_id, result)
    }

    pub fn delete_habit(&self, habit_id: &str) -> Result<()> {
        // owner_id is never edited, so the check cannot go stale.
        let result = self
            .habit(habit_id)
            .and_then(|_| self.tracker.store.delete_habit(habit_id));
        logged("delete_habit", habit_id, result)
    }

    pub fn toggle_completion(&self, habit_id: &str, date: &str) -> Result<StreakResult> {
        let result = (|| -> Result<StreakResult> {
            let day = parse_day(date)?;
            let habit = self.habit(habit_id)?;
            let set = self.tracker.store.toggle(habit_id, day)?;
            let streaks = compute_streaks_from_days(
                &habit,
                &parse_completion_set(&set),
                self.tracker.today(),
            );
            tracing::info!(
                habit_id,
                date = %day,
                completed = set.contains(&format_day(day)),
                current_streak = streaks.current_streak,
                "completion toggled"
            );
            Ok(streaks)
        })();
        logged("toggle_completion", habit_id, result)
    }

    pub fn get_streaks(&self, habit_id: &str, as_of: Option<&str>) -> Result<StreakResult> {
        let result = (|| -> Result<StreakResult> {
            let as_of = parse_optional_day(as_of, self.tracker.today())?;
            let habit = self.habit(habit_id)?;
            let done = self.tracker.completion_days(habit_id)?;
            Ok(compute_streaks_from_days(&habit, &done, as_of))
        })();
        logged("get_streaks", habit_id, result)
    }

    pub fn habit_stats(&self, habit_id: &str, as_of: Option<&str>) -> Result<HabitStats> {
        let result = (|| -> Result<HabitStats> {
            let as_of = parse_optional_day(as_of, self.tracker.today())?;
            let habit = self.habit(habit_id)?;
            let done = self.tracker.completion_days(habit_id)?;
            Ok(habit_stats(&habit, &done, as_of))
        })();
        logged("habit_stats", habit_id, result)
    }

    pub fn calendar(&self, habit_id: &str, start: &str, end: &str) -> Result<Vec<CalendarMark>> {
        let result = (|| -> Result<Vec<CalendarMark>> {
            let start = parse_day(start)?;
            let end = parse_day(end)?;
            if end < start {
                return Err(ValidationError::InvalidRange { start, end }.into());
            }
            let habit = self.habit(habit_id)?;
            let done = self.tracker.completion_days(habit_id)?;
            Ok(calendar_marks(&habit, &done, start, end))
        })();
        logged("calendar", habit_id, result)
    }
}
