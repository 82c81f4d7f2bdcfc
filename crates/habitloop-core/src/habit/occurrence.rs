//! Occurrence engine: decides which calendar days a habit is due on.
//!
//! Monthly habits created on the 29th, 30th or 31st are due on the last
//! day of any month too short to carry that day. No month is skipped.

use std::iter::FusedIterator;

use chrono::{Datelike, Days, NaiveDate};

use super::dates::clamped_day;
use super::{Frequency, Habit, RetiredRule};

/// Whether `date` is a due occurrence of `habit` under the rule in effect
/// on that day.
pub fn is_due(habit: &Habit, date: NaiveDate) -> bool {
    if date < habit.created_at {
        return false;
    }
    matches_rule(habit.frequency_on(date), habit.created_at, date)
}

/// Weekly and monthly rules stay anchored on the creation day, whichever
/// rule was in effect before them.
fn matches_rule(frequency: Frequency, anchor: NaiveDate, date: NaiveDate) -> bool {
    match frequency {
        Frequency::Daily => true,
        Frequency::Weekly => date.weekday() == anchor.weekday(),
        Frequency::Monthly => clamped_day(date.year(), date.month(), anchor.day()) == Some(date),
    }
}

/// All due occurrences in `[start, end]`, ascending.
pub fn due_occurrences_between(habit: &Habit, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    DueDates::new(habit, start, end).collect()
}

/// Lazy iterator over the due occurrences of a habit within a closed range.
///
/// Holds no reference to the habit; a fresh iterator restarts from `start`.
#[derive(Debug, Clone)]
pub struct DueDates {
    frequency: Frequency,
    history: Vec<RetiredRule>,
    anchor: NaiveDate,
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl DueDates {
    pub fn new(habit: &Habit, start: NaiveDate, end: NaiveDate) -> Self {
        let mut dates = Self {
            frequency: habit.frequency,
            history: habit.rule_history.clone(),
            anchor: habit.created_at,
            next: None,
            end,
        };
        let lower = start.max(habit.created_at);
        dates.next = dates.first_on_or_after(lower).filter(|d| *d <= end);
        dates
    }

    /// Rule in effect on `day` and the first day it no longer applies.
    fn rule_at(&self, day: NaiveDate) -> (Frequency, Option<NaiveDate>) {
        self.history
            .iter()
            .find(|rule| day < rule.until)
            .map_or((self.frequency, None), |rule| (rule.frequency, Some(rule.until)))
    }

    fn first_on_or_after(&self, mut from: NaiveDate) -> Option<NaiveDate> {
        loop {
            let (frequency, until) = self.rule_at(from);
            let candidate = self.first_under(frequency, from)?;
            match until {
                Some(until) if candidate >= until => from = until,
                _ => return Some(candidate),
            }
        }
    }

    fn first_under(&self, frequency: Frequency, from: NaiveDate) -> Option<NaiveDate> {
        match frequency {
            Frequency::Daily => Some(from),
            Frequency::Weekly => {
                let target = self.anchor.weekday().num_days_from_monday();
                let current = from.weekday().num_days_from_monday();
                let offset = (target + 7 - current) % 7;
                from.checked_add_days(Days::new(u64::from(offset)))
            }
            Frequency::Monthly => {
                let candidate = clamped_day(from.year(), from.month(), self.anchor.day())?;
                if candidate >= from {
                    Some(candidate)
                } else {
                    self.in_following_month(candidate)
                }
            }
        }
    }

    fn in_following_month(&self, current: NaiveDate) -> Option<NaiveDate> {
        let (year, month) = if current.month() == 12 {
            (current.year() + 1, 1)
        } else {
            (current.year(), current.month() + 1)
        };
        clamped_day(year, month, self.anchor.day())
    }
}

impl Iterator for DueDates {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current
            .succ_opt()
            .and_then(|day| self.first_on_or_after(day))
            .filter(|d| *d <= self.end);
        Some(current)
    }
}

impl FusedIterator for DueDates {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn habit(frequency: Frequency, created_at: NaiveDate) -> Habit {
        Habit {
            id: "h".into(),
            owner_id: "u".into(),
            name: "test".into(),
            description: None,
            frequency,
            time_of_day: None,
            scheduled_time: None,
            created_at,
            rule_history: Vec::new(),
        }
    }

    #[test]
    fn never_due_before_creation() {
        for f in [Frequency::Daily, Frequency::Weekly, Frequency::Monthly] {
            let h = habit(f, d(2024, 3, 10));
            assert!(!is_due(&h, d(2024, 3, 9)));
            assert!(!is_due(&h, d(2024, 2, 10)));
            assert!(is_due(&h, d(2024, 3, 10)));
        }
    }

    #[test]
    fn daily_is_due_every_day() {
        let h = habit(Frequency::Daily, d(2024, 1, 1));
        let dates = due_occurrences_between(&h, d(2024, 1, 30), d(2024, 2, 2));
        assert_eq!(
            dates,
            vec![d(2024, 1, 30), d(2024, 1, 31), d(2024, 2, 1), d(2024, 2, 2)]
        );
    }

    #[test]
    fn weekly_follows_creation_weekday() {
        // 2024-01-01 is a Monday
        let h = habit(Frequency::Weekly, d(2024, 1, 1));
        assert_eq!(h.created_at.weekday(), Weekday::Mon);
        assert!(is_due(&h, d(2024, 1, 8)));
        assert!(!is_due(&h, d(2024, 1, 9)));

        let dates = due_occurrences_between(&h, d(2024, 1, 3), d(2024, 1, 31));
        assert_eq!(
            dates,
            vec![d(2024, 1, 8), d(2024, 1, 15), d(2024, 1, 22), d(2024, 1, 29)]
        );
    }

    #[test]
    fn monthly_on_the_31st_lands_on_month_end() {
        let h = habit(Frequency::Monthly, d(2024, 1, 31));
        assert!(is_due(&h, d(2024, 4, 30)));
        assert!(!is_due(&h, d(2024, 4, 29)));
        assert!(is_due(&h, d(2024, 2, 29)));
        assert!(is_due(&h, d(2024, 3, 31)));
        assert!(!is_due(&h, d(2024, 3, 30)));

        let dates = due_occurrences_between(&h, d(2024, 1, 1), d(2024, 6, 30));
        assert_eq!(
            dates,
            vec![
                d(2024, 1, 31),
                d(2024, 2, 29),
                d(2024, 3, 31),
                d(2024, 4, 30),
                d(2024, 5, 31),
                d(2024, 6, 30),
            ]
        );
    }

    #[test]
    fn monthly_on_the_30th_in_february_of_a_common_year() {
        let h = habit(Frequency::Monthly, d(2022, 12, 30));
        assert!(is_due(&h, d(2023, 2, 28)));
        assert_eq!(
            due_occurrences_between(&h, d(2023, 1, 1), d(2023, 3, 31)),
            vec![d(2023, 1, 30), d(2023, 2, 28), d(2023, 3, 30)]
        );
    }

    #[test]
    fn monthly_range_starting_after_this_months_occurrence() {
        let h = habit(Frequency::Monthly, d(2024, 1, 15));
        assert_eq!(
            due_occurrences_between(&h, d(2024, 3, 20), d(2024, 5, 15)),
            vec![d(2024, 4, 15), d(2024, 5, 15)]
        );
    }

    #[test]
    fn empty_when_range_is_inverted_or_before_creation() {
        let h = habit(Frequency::Daily, d(2024, 5, 1));
        assert!(due_occurrences_between(&h, d(2024, 5, 10), d(2024, 5, 1)).is_empty());
        assert!(due_occurrences_between(&h, d(2024, 4, 1), d(2024, 4, 30)).is_empty());
    }

    #[test]
    fn iterator_is_restartable() {
        let h = habit(Frequency::Weekly, d(2024, 1, 1));
        let dates = DueDates::new(&h, d(2024, 1, 1), d(2024, 2, 1));
        let first: Vec<_> = dates.clone().collect();
        let second: Vec<_> = dates.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
    }

    #[test]
    fn edited_rule_leaves_earlier_due_dates_alone() {
        // Daily from Mon 2024-01-01, weekly (Mondays) from 2024-01-10.
        let mut h = habit(Frequency::Daily, d(2024, 1, 1));
        h.change_frequency(Frequency::Weekly, d(2024, 1, 10));

        assert!(is_due(&h, d(2024, 1, 2)));
        assert!(is_due(&h, d(2024, 1, 9)));
        assert!(!is_due(&h, d(2024, 1, 10)));
        assert!(is_due(&h, d(2024, 1, 15)));

        let dates = due_occurrences_between(&h, d(2024, 1, 7), d(2024, 1, 31));
        assert_eq!(
            dates,
            vec![
                d(2024, 1, 7),
                d(2024, 1, 8),
                d(2024, 1, 9),
                d(2024, 1, 15),
                d(2024, 1, 22),
                d(2024, 1, 29),
            ]
        );
    }

    #[test]
    fn monthly_rule_with_no_occurrence_before_its_replacement() {
        // Monthly on the 20th until 2024-02-10, then daily.
        let mut h = habit(Frequency::Monthly, d(2024, 1, 20));
        h.change_frequency(Frequency::Daily, d(2024, 2, 10));
        assert_eq!(
            due_occurrences_between(&h, d(2024, 1, 1), d(2024, 2, 11)),
            vec![d(2024, 1, 20), d(2024, 2, 10), d(2024, 2, 11)]
        );
    }

    fn frequency() -> impl Strategy<Value = Frequency> {
        prop_oneof![
            Just(Frequency::Daily),
            Just(Frequency::Weekly),
            Just(Frequency::Monthly)
        ]
    }

    proptest! {
        #[test]
        fn due_sequence_is_strictly_ascending_and_complete(
            f in frequency(),
            created_offset in 0i64..800,
            start_offset in 0i64..900,
            len in 0i64..400,
        ) {
            let base = d(2023, 1, 1);
            let created = base + chrono::Duration::days(created_offset);
            let start = base + chrono::Duration::days(start_offset);
            let end = start + chrono::Duration::days(len);
            let h = habit(f, created);

            let dates = due_occurrences_between(&h, start, end);
            for pair in dates.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            for day in &dates {
                prop_assert!(is_due(&h, *day));
                prop_assert!(*day >= start && *day <= end);
            }
            let brute: Vec<_> = start
                .iter_days()
                .take_while(|day| *day <= end)
                .filter(|day| is_due(&h, *day))
                .collect();
            prop_assert_eq!(dates, brute);
        }
    }

    proptest! {
        #[test]
        fn edited_habits_match_a_day_by_day_scan(
            first in frequency(),
            edits in proptest::collection::vec((frequency(), 1i64..120), 0..4),
            start_offset in 0i64..500,
            len in 0i64..300,
        ) {
            let created = d(2023, 1, 31);
            let mut h = habit(first, created);
            let mut effective = created;
            for (f, gap) in edits {
                effective = effective + chrono::Duration::days(gap);
                h.change_frequency(f, effective);
            }
            let start = created + chrono::Duration::days(start_offset);
            let end = start + chrono::Duration::days(len);

            let dates = due_occurrences_between(&h, start, end);
            let brute: Vec<_> = start
                .iter_days()
                .take_while(|day| *day <= end)
                .filter(|day| is_due(&h, *day))
                .collect();
            prop_assert_eq!(dates, brute);
        }
    }
}
