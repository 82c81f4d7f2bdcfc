//! # Habitloop Core Library
//!
//! This library provides the core logic for the Habitloop habit tracker.
//! It follows a CLI-first philosophy: every operation is reachable from the
//! standalone CLI binary, and any other front end is a thin layer over the
//! same core.
//!
//! ## Architecture
//!
//! - **Occurrence engine**: decides whether a habit is due on a calendar day
//!   (daily / weekly / monthly, with month-end clamping). A frequency edit
//!   only governs days from the edit on; earlier days keep the rule they
//!   had
//! - **Streak calculator**: current and longest streak counted in due
//!   occurrences, recomputed from the completion set on every call
//! - **Storage**: interchangeable completion stores (SQLite, in-memory) behind
//!   the [`HabitStore`] and [`CompletionStore`] traits, plus TOML configuration
//! - **Tracker**: the service facade request handlers call
//!
//! ## Key Components
//!
//! - [`HabitTracker`]: toggle, streak and agenda operations over a store
//! - [`OwnerScope`]: the same habit-id operations limited to one owner
//! - [`compute_streaks`] / [`is_due`]: the pure calculations
//! - [`SqliteStore`] / [`MemoryStore`]: storage adapters
//! - [`Config`]: application configuration management

pub mod error;
pub mod habit;
pub mod storage;
pub mod tracker;

pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use habit::{
    compute_streaks, due_occurrences_between, is_due, CalendarMark, DailyProgress, Frequency,
    Habit, HabitStats, HabitUpdate, NewHabit, RetiredRule, StreakResult, TimeOfDay,
};
pub use storage::{CompletionStore, Config, HabitStore, MemoryStore, SqliteStore, Store};
pub use tracker::{AgendaEntry, Clock, FixedClock, HabitTracker, OwnerScope, SystemClock};
