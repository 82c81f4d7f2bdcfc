//! Persistence adapters and configuration.
//!
//! The core never depends on a concrete engine: request handlers receive
//! a store implementing [`HabitStore`] and [`CompletionStore`], picked at
//! startup from [`Config`].

mod config;
pub mod database;
pub mod memory;
pub mod migrations;

pub use config::{Config, LoggingConfig, StatsConfig, StorageBackend, StorageConfig};
pub use database::SqliteStore;
pub use memory::MemoryStore;

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::error::{ConfigError, Result};
use crate::habit::Habit;

/// Habit records.
pub trait HabitStore: Send + Sync {
    fn insert_habit(&self, habit: &Habit) -> Result<()>;

    /// # Errors
    /// [`CoreError::NotFound`](crate::CoreError::NotFound) for an unknown id.
    fn get_habit(&self, habit_id: &str) -> Result<Habit>;

    fn list_habits(&self, owner_id: Option<&str>) -> Result<Vec<Habit>>;

    fn update_habit(&self, habit: &Habit) -> Result<()>;

    /// Remove a habit together with its completions.
    fn delete_habit(&self, habit_id: &str) -> Result<()>;
}

/// Per-habit completion sets, stored as `YYYY-MM-DD` strings.
pub trait CompletionStore: Send + Sync {
    fn list_completions(&self, habit_id: &str) -> Result<BTreeSet<String>>;

    /// Flip membership of `day` atomically and return the resulting set.
    fn toggle(&self, habit_id: &str, day: NaiveDate) -> Result<BTreeSet<String>>;
}

/// Everything a tracker needs from its backing store.
pub trait Store: HabitStore + CompletionStore {}

impl<T: HabitStore + CompletionStore + ?Sized> Store for T {}

impl<T: HabitStore + ?Sized> HabitStore for Box<T> {
    fn insert_habit(&self, habit: &Habit) -> Result<()> {
        (**self).insert_habit(habit)
    }

    fn get_habit(&self, habit_id: &str) -> Result<Habit> {
        (**self).get_habit(habit_id)
    }

    fn list_habits(&self, owner_id: Option<&str>) -> Result<Vec<Habit>> {
        (**self).list_habits(owner_id)
    }

    fn update_habit(&self, habit: &Habit) -> Result<()> {
        (**self).update_habit(habit)
    }

    fn delete_habit(&self, habit_id: &str) -> Result<()> {
        (**self).delete_habit(habit_id)
    }
}

impl<T: CompletionStore + ?Sized> CompletionStore for Box<T> {
    fn list_completions(&self, habit_id: &str) -> Result<BTreeSet<String>> {
        (**self).list_completions(habit_id)
    }

    fn toggle(&self, habit_id: &str, day: NaiveDate) -> Result<BTreeSet<String>> {
        (**self).toggle(habit_id, day)
    }
}

/// Open the backend selected in `config`.
pub fn open_store(config: &Config) -> Result<Box<dyn Store>> {
    match config.storage.backend {
        StorageBackend::Sqlite => {
            let path = config.database_path()?;
            tracing::debug!(path = %path.display(), "opening sqlite store");
            Ok(Box::new(SqliteStore::open(path)?))
        }
        StorageBackend::Memory => {
            tracing::debug!("using in-memory store");
            Ok(Box::new(MemoryStore::new()))
        }
    }
}

/// Returns the data directory, creating it if needed.
///
/// `HABITLOOP_DATA_DIR` wins when set. Otherwise `~/.config/habitloop`,
/// or `~/.config/habitloop-dev` with `HABITLOOP_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("HABITLOOP_DATA_DIR") {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("HABITLOOP_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("habitloop-dev")
            } else {
                base_dir.join("habitloop")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
