//! SQLite-backed habit and completion storage.
//!
//! Provides persistent storage for:
//! - Habits and their recurrence rules
//! - Rules replaced by frequency edits, so past due dates stay put
//! - Completion days, one row per `(habit_id, completed_date)`
//!
//! Toggles run in an `IMMEDIATE` transaction so concurrent writers to the
//! same file serialize on the database lock.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use super::migrations;
use super::{CompletionStore, HabitStore};
use crate::error::{CoreError, DatabaseError, Result};
use crate::habit::dates::{format_day, parse_created_at, parse_day};
use crate::habit::{Habit, RetiredRule};

const HABIT_COLUMNS: &str =
    "id, owner_id, name, description, frequency, scheduled_time, created_at, time_of_day";

/// A habit row as stored; frequency and creation day are validated on load.
struct HabitRow {
    id: String,
    owner_id: String,
    name: String,
    description: Option<String>,
    frequency: String,
    scheduled_time: Option<String>,
    created_at: String,
    time_of_day: Option<String>,
}

impl HabitRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            frequency: row.get(4)?,
            scheduled_time: row.get(5)?,
            created_at: row.get(6)?,
            time_of_day: row.get(7)?,
        })
    }

    /// The rule history is loaded separately.
    fn into_habit(self) -> Result<Habit> {
        Ok(Habit {
            frequency: self.frequency.parse()?,
            created_at: parse_created_at(&self.created_at)?,
            time_of_day: self.time_of_day.map(|t| t.parse()).transpose()?,
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            description: self.description,
            scheduled_time: self.scheduled_time,
            rule_history: Vec::new(),
        })
    }
}

/// SQLite store for habits and completions.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply migrations.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Database(DatabaseError::Poisoned))
    }

    fn ensure_habit(conn: &Connection, habit_id: &str) -> Result<()> {
        let found = conn
            .query_row(
                "SELECT 1 FROM habits WHERE id = ?1",
                params![habit_id],
                |_| Ok(()),
            )
            .optional()?;
        found.ok_or_else(|| CoreError::not_found(habit_id))
    }

    fn completions_of(conn: &Connection, habit_id: &str) -> Result<BTreeSet<String>> {
        let mut stmt =
            conn.prepare("SELECT completed_date FROM habit_completions WHERE habit_id = ?1")?;
        let rows = stmt.query_map(params![habit_id], |row| row.get::<_, String>(0))?;
        let mut set = BTreeSet::new();
        for row in rows {
            set.insert(row?);
        }
        Ok(set)
    }

    fn rules_of(conn: &Connection, habit_id: &str) -> Result<Vec<RetiredRule>> {
        let mut stmt = conn.prepare(
            "SELECT frequency, until_date FROM habit_rule_history
             WHERE habit_id = ?1 ORDER BY until_date ASC",
        )?;
        let rows = stmt.query_map(params![habit_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut rules = Vec::new();
        for row in rows {
            let (frequency, until) = row?;
            rules.push(RetiredRule {
                frequency: frequency.parse()?,
                until: parse_day(&until)?,
            });
        }
        Ok(rules)
    }

    fn load_habit(conn: &Connection, row: HabitRow) -> Result<Habit> {
        let mut habit = row.into_habit()?;
        habit.rule_history = Self::rules_of(conn, &habit.id)?;
        Ok(habit)
    }

    fn write_rules(conn: &Connection, habit: &Habit) -> Result<()> {
        conn.execute(
            "DELETE FROM habit_rule_history WHERE habit_id = ?1",
            params![habit.id],
        )?;
        for rule in &habit.rule_history {
            conn.execute(
                "INSERT INTO habit_rule_history (habit_id, frequency, until_date)
                 VALUES (?1, ?2, ?3)",
                params![habit.id, rule.frequency.as_str(), format_day(rule.until)],
            )?;
        }
        Ok(())
    }

    /// Insert a raw completion record without validation, as an import of
    /// legacy data would.
    pub fn import_completion(&self, habit_id: &str, record: &str) -> Result<()> {
        let conn = self.conn()?;
        Self::ensure_habit(&conn, habit_id)?;
        conn.execute(
            "INSERT OR IGNORE INTO habit_completions (habit_id, completed_date) VALUES (?1, ?2)",
            params![habit_id, record],
        )?;
        Ok(())
    }
}

impl HabitStore for SqliteStore {
    fn insert_habit(&self, habit: &Habit) -> Result<()> {
        let conn = self.conn()?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        tx.execute(
            &format!(
                "INSERT INTO habits ({HABIT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ),
            params![
                habit.id,
                habit.owner_id,
                habit.name,
                habit.description,
                habit.frequency.as_str(),
                habit.scheduled_time,
                format_day(habit.created_at),
                habit.time_of_day.map(|t| t.as_str()),
            ],
        )?;
        Self::write_rules(&tx, habit)?;
        tx.commit()?;
        Ok(())
    }

    fn get_habit(&self, habit_id: &str) -> Result<Habit> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1"),
                params![habit_id],
                HabitRow::from_row,
            )
            .optional()?;
        let row = row.ok_or_else(|| CoreError::not_found(habit_id))?;
        Self::load_habit(&conn, row)
    }

    fn list_habits(&self, owner_id: Option<&str>) -> Result<Vec<Habit>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {HABIT_COLUMNS} FROM habits
             WHERE ?1 IS NULL OR owner_id = ?1
             ORDER BY created_at ASC, id ASC"
        ))?;
        let rows = stmt
            .query_map(params![owner_id], HabitRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter()
            .map(|row| Self::load_habit(&conn, row))
            .collect()
    }

    fn update_habit(&self, habit: &Habit) -> Result<()> {
        let conn = self.conn()?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE habits
             SET name = ?2, description = ?3, frequency = ?4, scheduled_time = ?5,
                 time_of_day = ?6
             WHERE id = ?1",
            params![
                habit.id,
                habit.name,
                habit.description,
                habit.frequency.as_str(),
                habit.scheduled_time,
                habit.time_of_day.map(|t| t.as_str()),
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found(&habit.id));
        }
        Self::write_rules(&tx, habit)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_habit(&self, habit_id: &str) -> Result<()> {
        let conn = self.conn()?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM habit_completions WHERE habit_id = ?1",
            params![habit_id],
        )?;
        tx.execute(
            "DELETE FROM habit_rule_history WHERE habit_id = ?1",
            params![habit_id],
        )?;
        let removed = tx.execute("DELETE FROM habits WHERE id = ?1", params![habit_id])?;
        if removed == 0 {
            return Err(CoreError::not_found(habit_id));
        }
        tx.commit()?;
        Ok(())
    }
}

impl CompletionStore for SqliteStore {
    fn list_completions(&self, habit_id: &str) -> Result<BTreeSet<String>> {
        let conn = self.conn()?;
        Self::ensure_habit(&conn, habit_id)?;
        Self::completions_of(&conn, habit_id)
    }

    fn toggle(&self, habit_id: &str, day: NaiveDate) -> Result<BTreeSet<String>> {
        let conn = self.conn()?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        Self::ensure_habit(&tx, habit_id)?;

        let key = format_day(day);
        let removed = tx.execute(
            "DELETE FROM habit_completions WHERE habit_id = ?1 AND completed_date = ?2",
            params![habit_id, key],
        )?;
        if removed == 0 {
            tx.execute(
                "INSERT INTO habit_completions (habit_id, completed_date) VALUES (?1, ?2)",
                params![habit_id, key],
            )?;
        }

        let set = Self::completions_of(&tx, habit_id)?;
        tx.commit()?;
        Ok(set)
    }
}
