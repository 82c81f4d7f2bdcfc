//! Integration tests for the tracker over a file-backed SQLite store.

use chrono::NaiveDate;
use habitloop_core::{
    CoreError, FixedClock, Frequency, HabitTracker, HabitUpdate, NewHabit, SqliteStore,
    StreakResult,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn new_habit(name: &str, frequency: Frequency, created_at: NaiveDate) -> NewHabit {
    NewHabit {
        owner_id: "local".into(),
        name: name.into(),
        description: None,
        frequency,
        time_of_day: None,
        scheduled_time: None,
        created_at: Some(created_at),
    }
}

#[test]
fn test_monthly_habit_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("habits.db");

    let habit_id = {
        let store = SqliteStore::open(&path).unwrap();
        let tracker = HabitTracker::with_clock(store, FixedClock(d(2024, 4, 30)));
        let habit = tracker
            .create_habit(new_habit("Pay rent", Frequency::Monthly, d(2024, 1, 31)))
            .unwrap();

        // Short months clamp to their last day.
        for day in ["2024-01-31", "2024-02-29", "2024-03-31"] {
            tracker.toggle_completion(&habit.id, day).unwrap();
        }
        habit.id
    };

    let store = SqliteStore::open(&path).unwrap();
    // Legacy garbage is ignored rather than failing the read.
    store.import_completion(&habit_id, "31/03/2024").unwrap();
    let tracker = HabitTracker::with_clock(store, FixedClock(d(2024, 4, 30)));

    // Apr 30 is due but still open, so it does not break the run.
    let streaks = tracker.get_streaks(&habit_id, None).unwrap();
    assert_eq!(
        streaks,
        StreakResult {
            current_streak: 3,
            longest_streak: 3
        }
    );

    let stats = tracker.habit_stats(&habit_id, None).unwrap();
    assert_eq!(stats.due_occurrences, 4);
    assert_eq!(stats.completed_occurrences, 3);
    assert_eq!(stats.total_completions, 3);
    assert!((stats.completion_rate - 75.0).abs() < f64::EPSILON);

    // One day later April is a miss.
    let streaks = tracker.get_streaks(&habit_id, Some("2024-05-01")).unwrap();
    assert_eq!(streaks.current_streak, 0);
    assert_eq!(streaks.longest_streak, 3);
}

#[test]
fn test_frequency_change_keeps_past_due_dates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("habits.db");

    let habit_id = {
        let store = SqliteStore::open(&path).unwrap();
        let tracker = HabitTracker::with_clock(store, FixedClock(d(2024, 1, 10)));
        // 2024-01-01 is a Monday.
        let habit = tracker
            .create_habit(new_habit("Walk", Frequency::Daily, d(2024, 1, 1)))
            .unwrap();
        for day in 1..=9 {
            tracker
                .toggle_completion(&habit.id, &format!("2024-01-{day:02}"))
                .unwrap();
        }
        let before = tracker.get_streaks(&habit.id, None).unwrap();
        assert_eq!(before, StreakResult { current_streak: 9, longest_streak: 9 });

        tracker
            .update_habit(
                &habit.id,
                HabitUpdate {
                    frequency: Some(Frequency::Weekly),
                    ..HabitUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(tracker.get_streaks(&habit.id, None).unwrap(), before);
        habit.id
    };

    // A week later, reopened from disk, the daily stretch still counts.
    let store = SqliteStore::open(&path).unwrap();
    let tracker = HabitTracker::with_clock(store, FixedClock(d(2024, 1, 16)));
    let habit = tracker.get_habit(&habit_id).unwrap();
    assert_eq!(habit.frequency, Frequency::Weekly);
    assert!(tracker.is_due_today(&habit, Some("2024-01-02")).unwrap());
    assert!(!tracker.is_due_today(&habit, Some("2024-01-11")).unwrap());

    let r = tracker.toggle_completion(&habit_id, "2024-01-15").unwrap();
    assert_eq!(r, StreakResult { current_streak: 10, longest_streak: 10 });

    let stats = tracker.habit_stats(&habit_id, None).unwrap();
    assert_eq!(stats.due_occurrences, 10);
    assert_eq!(stats.completed_occurrences, 10);
}

#[test]
fn test_owner_scope_hides_other_owners_habits() {
    let store = SqliteStore::open_memory().unwrap();
    let tracker = HabitTracker::with_clock(store, FixedClock(d(2024, 1, 3)));
    let habit = tracker
        .create_habit(new_habit("Floss", Frequency::Daily, d(2024, 1, 1)))
        .unwrap();

    let other = tracker.scoped(Some("someone-else"));
    assert!(matches!(
        other.toggle_completion(&habit.id, "2024-01-02"),
        Err(CoreError::NotFound { .. })
    ));
    assert!(matches!(other.delete_habit(&habit.id), Err(CoreError::NotFound { .. })));
    assert!(tracker.get_habit(&habit.id).is_ok());

    let owner = tracker.scoped(Some("local"));
    assert_eq!(owner.toggle_completion(&habit.id, "2024-01-03").unwrap().current_streak, 1);
}

#[test]
fn test_delete_removes_completions() {
    let store = SqliteStore::open_memory().unwrap();
    let tracker = HabitTracker::with_clock(store, FixedClock(d(2024, 1, 3)));
    let habit = tracker
        .create_habit(new_habit("Floss", Frequency::Daily, d(2024, 1, 1)))
        .unwrap();
    tracker.toggle_completion(&habit.id, "2024-01-02").unwrap();

    tracker.delete_habit(&habit.id).unwrap();

    assert!(tracker.get_habit(&habit.id).is_err());
    assert!(tracker.toggle_completion(&habit.id, "2024-01-03").is_err());
    assert!(tracker.list_habits(Some("local")).unwrap().is_empty());
}
