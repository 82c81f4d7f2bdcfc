//! Habits, recurrence rules and the pure calculations over them.
//!
//! - [`occurrence`]: which calendar days a habit is due on
//! - [`streak`]: current / longest streak in units of due occurrences
//! - [`stats`]: completion rates, calendar marks, daily progress

pub mod dates;
pub mod occurrence;
pub mod stats;
pub mod streak;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ValidationError};

pub use occurrence::{due_occurrences_between, is_due, DueDates};
pub use stats::{
    calendar_marks, daily_progress, habit_stats, CalendarMark, DailyProgress, HabitStats,
    MAX_PROGRESS_DAYS,
};
pub use streak::{compute_streaks, compute_streaks_from_days, StreakResult};

/// Recurrence rule of a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(CoreError::UnknownFrequency(other.to_string())),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Part of the day a habit is grouped under on the agenda.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(TimeOfDay::Morning),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "evening" => Ok(TimeOfDay::Evening),
            other => Err(ValidationError::InvalidValue {
                field: "time_of_day".into(),
                message: format!("'{other}' is not morning, afternoon or evening"),
            }),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recurrence rule replaced by an edit. It governs every day before
/// `until`; the habit's current `frequency` governs from the last `until` on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetiredRule {
    pub frequency: Frequency,
    pub until: NaiveDate,
}

/// A tracked habit.
///
/// `created_at` is a calendar day; the habit is never due before it.
/// `time_of_day` and `scheduled_time` only order habits within a day.
/// `rule_history` is ascending by `until` and keeps earlier days on the
/// rule they had when a frequency edit happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub frequency: Frequency,
    #[serde(default)]
    pub time_of_day: Option<TimeOfDay>,
    #[serde(default)]
    pub scheduled_time: Option<String>,
    pub created_at: NaiveDate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_history: Vec<RetiredRule>,
}

impl Habit {
    /// The recurrence rule in effect on `date`.
    pub fn frequency_on(&self, date: NaiveDate) -> Frequency {
        self.rule_history
            .iter()
            .find(|rule| date < rule.until)
            .map_or(self.frequency, |rule| rule.frequency)
    }

    /// First day the current `frequency` applies to.
    pub fn current_rule_start(&self) -> NaiveDate {
        self.rule_history
            .last()
            .map_or(self.created_at, |rule| rule.until.max(self.created_at))
    }

    /// Switch to `frequency` from `effective_from` on. Days before it keep
    /// the rule they were due under.
    pub fn change_frequency(&mut self, frequency: Frequency, effective_from: NaiveDate) {
        if frequency == self.frequency {
            return;
        }
        // A rule that never governed a day leaves nothing to keep.
        if effective_from > self.current_rule_start() {
            self.rule_history.push(RetiredRule {
                frequency: self.frequency,
                until: effective_from,
            });
        }
        self.frequency = frequency;
    }
}

/// Input for creating a habit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHabit {
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub frequency: Frequency,
    #[serde(default)]
    pub time_of_day: Option<TimeOfDay>,
    #[serde(default)]
    pub scheduled_time: Option<String>,
    /// Defaults to the tracker's current day.
    #[serde(default)]
    pub created_at: Option<NaiveDate>,
}

/// Editable fields of a habit. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HabitUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<Frequency>,
    pub time_of_day: Option<TimeOfDay>,
    pub scheduled_time: Option<String>,
}

impl HabitUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.frequency.is_none()
            && self.time_of_day.is_none()
            && self.scheduled_time.is_none()
    }

    /// Apply the update in place. `created_at` and the id never change.
    ///
    /// A new frequency applies from `effective_from`; due dates before it
    /// are left as they were.
    pub fn apply_to(self, habit: &mut Habit, effective_from: NaiveDate) -> Result<(), ValidationError> {
        if let Some(name) = self.name {
            habit.name = validate_name(&name)?;
        }
        if let Some(description) = self.description {
            habit.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(frequency) = self.frequency {
            habit.change_frequency(frequency, effective_from);
        }
        if let Some(part) = self.time_of_day {
            habit.time_of_day = Some(part);
        }
        if let Some(time) = self.scheduled_time {
            habit.scheduled_time = Some(time).filter(|t| !t.trim().is_empty());
        }
        Ok(())
    }
}

pub(crate) fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("name".into()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn habit() -> Habit {
        Habit {
            id: "h1".into(),
            owner_id: "u1".into(),
            name: "Read".into(),
            description: None,
            frequency: Frequency::Daily,
            time_of_day: Some(TimeOfDay::Morning),
            scheduled_time: Some("07:30".into()),
            created_at: d(2024, 1, 1),
            rule_history: Vec::new(),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn frequency_parses_known_literals() {
        assert_eq!("daily".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert_eq!("weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert_eq!("monthly".parse::<Frequency>().unwrap(), Frequency::Monthly);
    }

    #[test]
    fn unknown_frequency_is_an_error_not_daily() {
        match "Daily".parse::<Frequency>() {
            Err(CoreError::UnknownFrequency(v)) => assert_eq!(v, "Daily"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!("yearly".parse::<Frequency>().is_err());
    }

    #[test]
    fn habit_json_uses_wire_literals() {
        let json = serde_json::to_value(habit()).unwrap();
        assert_eq!(json["frequency"], "daily");
        assert_eq!(json["created_at"], "2024-01-01");

        let bad = r#"{"id":"x","owner_id":"u","name":"n","frequency":"hourly","created_at":"2024-01-01"}"#;
        assert!(serde_json::from_str::<Habit>(bad).is_err());
    }

    #[test]
    fn update_keeps_creation_day() {
        let mut h = habit();
        HabitUpdate {
            name: Some("  Read more ".into()),
            frequency: Some(Frequency::Weekly),
            ..Default::default()
        }
        .apply_to(&mut h, d(2024, 2, 1))
        .unwrap();
        assert_eq!(h.name, "Read more");
        assert_eq!(h.frequency, Frequency::Weekly);
        assert_eq!(h.created_at, d(2024, 1, 1));
        assert_eq!(h.scheduled_time.as_deref(), Some("07:30"));
        assert_eq!(h.time_of_day, Some(TimeOfDay::Morning));
    }

    #[test]
    fn frequency_edit_keeps_earlier_days_on_the_old_rule() {
        let mut h = habit();
        h.change_frequency(Frequency::Weekly, d(2024, 1, 10));
        assert_eq!(h.frequency_on(d(2024, 1, 2)), Frequency::Daily);
        assert_eq!(h.frequency_on(d(2024, 1, 9)), Frequency::Daily);
        assert_eq!(h.frequency_on(d(2024, 1, 10)), Frequency::Weekly);

        h.change_frequency(Frequency::Monthly, d(2024, 3, 1));
        assert_eq!(h.frequency_on(d(2024, 2, 29)), Frequency::Weekly);
        assert_eq!(h.frequency_on(d(2024, 3, 1)), Frequency::Monthly);
        assert_eq!(
            h.rule_history,
            vec![
                RetiredRule { frequency: Frequency::Daily, until: d(2024, 1, 10) },
                RetiredRule { frequency: Frequency::Weekly, until: d(2024, 3, 1) },
            ]
        );
    }

    #[test]
    fn same_day_edits_do_not_record_empty_rules() {
        let mut h = habit();
        // Edited on the creation day: the first rule never applied.
        h.change_frequency(Frequency::Weekly, d(2024, 1, 1));
        assert!(h.rule_history.is_empty());

        h.change_frequency(Frequency::Monthly, d(2024, 1, 5));
        h.change_frequency(Frequency::Daily, d(2024, 1, 5));
        assert_eq!(h.rule_history.len(), 1);
        assert_eq!(h.rule_history[0].frequency, Frequency::Weekly);
        assert_eq!(h.frequency, Frequency::Daily);

        // Same frequency is a no-op.
        h.change_frequency(Frequency::Daily, d(2024, 2, 1));
        assert_eq!(h.rule_history.len(), 1);
    }

    #[test]
    fn time_of_day_parses_and_orders() {
        assert_eq!("evening".parse::<TimeOfDay>().unwrap(), TimeOfDay::Evening);
        assert!(matches!(
            "night".parse::<TimeOfDay>(),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(TimeOfDay::Morning < TimeOfDay::Afternoon);
        assert!(TimeOfDay::Afternoon < TimeOfDay::Evening);
    }

    #[test]
    fn update_rejects_blank_name() {
        let mut h = habit();
        let err = HabitUpdate {
            name: Some("   ".into()),
            ..Default::default()
        }
        .apply_to(&mut h, d(2024, 2, 1))
        .unwrap_err();
        assert!(matches!(err, ValidationError::EmptyField(_)));
        assert_eq!(h.name, "Read");
    }
}
