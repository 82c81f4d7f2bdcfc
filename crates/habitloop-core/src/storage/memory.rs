//! In-process store.
//!
//! An owned instance, created at startup and handed to whoever serves
//! requests. One mutex guards habits and completions together so a toggle
//! is a single critical section.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;

use super::{CompletionStore, HabitStore};
use crate::error::{CoreError, DatabaseError, Result};
use crate::habit::dates::format_day;
use crate::habit::Habit;

#[derive(Debug, Default)]
struct Inner {
    habits: HashMap<String, Habit>,
    completions: HashMap<String, BTreeSet<String>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Database(DatabaseError::Poisoned))
    }

    /// Replace a habit's completion set wholesale, as an import would.
    ///
    /// Records are kept verbatim; malformed ones are filtered when
    /// streaks are computed.
    pub fn seed_completions<I, S>(&self, habit_id: &str, records: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.lock()?;
        if !inner.habits.contains_key(habit_id) {
            return Err(CoreError::not_found(habit_id));
        }
        inner.completions.insert(
            habit_id.to_string(),
            records.into_iter().map(Into::into).collect(),
        );
        Ok(())
    }
}

impl HabitStore for MemoryStore {
    fn insert_habit(&self, habit: &Habit) -> Result<()> {
        let mut inner = self.lock()?;
        inner.habits.insert(habit.id.clone(), habit.clone());
        inner.completions.entry(habit.id.clone()).or_default();
        Ok(())
    }

    fn get_habit(&self, habit_id: &str) -> Result<Habit> {
        self.lock()?
            .habits
            .get(habit_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(habit_id))
    }

    fn list_habits(&self, owner_id: Option<&str>) -> Result<Vec<Habit>> {
        let inner = self.lock()?;
        let mut habits: Vec<Habit> = inner
            .habits
            .values()
            .filter(|h| owner_id.map_or(true, |owner| h.owner_id == owner))
            .cloned()
            .collect();
        habits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(habits)
    }

    fn update_habit(&self, habit: &Habit) -> Result<()> {
        let mut inner = self.lock()?;
        match inner.habits.get_mut(&habit.id) {
            Some(existing) => {
                *existing = habit.clone();
                Ok(())
            }
            None => Err(CoreError::not_found(&habit.id)),
        }
    }

    fn delete_habit(&self, habit_id: &str) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.habits.remove(habit_id).is_none() {
            return Err(CoreError::not_found(habit_id));
        }
        inner.completions.remove(habit_id);
        Ok(())
    }
}

impl CompletionStore for MemoryStore {
    fn list_completions(&self, habit_id: &str) -> Result<BTreeSet<String>> {
        let inner = self.lock()?;
        if !inner.habits.contains_key(habit_id) {
            return Err(CoreError::not_found(habit_id));
        }
        Ok(inner.completions.get(habit_id).cloned().unwrap_or_default())
    }

    fn toggle(&self, habit_id: &str, day: NaiveDate) -> Result<BTreeSet<String>> {
        let mut inner = self.lock()?;
        if !inner.habits.contains_key(habit_id) {
            return Err(CoreError::not_found(habit_id));
        }
        let set = inner.completions.entry(habit_id.to_string()).or_default();
        let key = format_day(day);
        if !set.remove(&key) {
            set.insert(key);
        }
        Ok(set.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::Frequency;
    use std::sync::Arc;
    use std::thread;

    fn habit(id: &str, owner: &str) -> Habit {
        Habit {
            id: id.into(),
            owner_id: owner.into(),
            name: id.into(),
            description: None,
            frequency: Frequency::Daily,
            time_of_day: None,
            scheduled_time: None,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            rule_history: Vec::new(),
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn toggle_flips_membership() {
        let store = MemoryStore::new();
        store.insert_habit(&habit("h1", "u1")).unwrap();

        let set = store.toggle("h1", day("2024-01-02")).unwrap();
        assert!(set.contains("2024-01-02"));
        let set = store.toggle("h1", day("2024-01-02")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn unknown_habit_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.get_habit("nope"), Err(CoreError::NotFound { .. })));
        assert!(matches!(
            store.toggle("nope", day("2024-01-01")),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.list_completions("nope"),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(store.delete_habit("nope"), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn list_filters_by_owner() {
        let store = MemoryStore::new();
        store.insert_habit(&habit("a", "u1")).unwrap();
        store.insert_habit(&habit("b", "u2")).unwrap();
        store.insert_habit(&habit("c", "u1")).unwrap();

        let ids: Vec<_> = store
            .list_habits(Some("u1"))
            .unwrap()
            .into_iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(store.list_habits(None).unwrap().len(), 3);
    }

    #[test]
    fn delete_drops_completions() {
        let store = MemoryStore::new();
        store.insert_habit(&habit("h1", "u1")).unwrap();
        store.toggle("h1", day("2024-01-02")).unwrap();
        store.delete_habit("h1").unwrap();

        store.insert_habit(&habit("h1", "u1")).unwrap();
        assert!(store.list_completions("h1").unwrap().is_empty());
    }

    #[test]
    fn concurrent_toggles_on_distinct_days_all_land() {
        let store = Arc::new(MemoryStore::new());
        store.insert_habit(&habit("h1", "u1")).unwrap();

        let handles: Vec<_> = (1..=20u32)
            .map(|n| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let d = NaiveDate::from_ymd_opt(2024, 1, n).unwrap();
                    store.toggle("h1", d).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.list_completions("h1").unwrap().len(), 20);
    }

    #[test]
    fn seeded_records_are_kept_verbatim() {
        let store = MemoryStore::new();
        store.insert_habit(&habit("h1", "u1")).unwrap();
        store
            .seed_completions("h1", ["2024-01-01", "not-a-date"])
            .unwrap();
        assert_eq!(store.list_completions("h1").unwrap().len(), 2);
    }

    #[test]
    fn update_keeps_rule_history() {
        let store = MemoryStore::new();
        let mut h = habit("a", "u1");
        store.insert_habit(&h).unwrap();
        h.change_frequency(Frequency::Weekly, day("2024-02-01"));
        store.update_habit(&h).unwrap();

        let loaded = store.get_habit("a").unwrap();
        assert_eq!(loaded.frequency_on(day("2024-01-31")), Frequency::Daily);
        assert_eq!(loaded.frequency_on(day("2024-02-01")), Frequency::Weekly);
    }
}
