//! Database schema migrations for habitloop.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: habits and their completions.
///
/// `(habit_id, completed_date)` is unique; a toggle either deletes the row
/// or inserts it.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS habits (
            id             TEXT PRIMARY KEY,
            owner_id       TEXT NOT NULL,
            name           TEXT NOT NULL,
            description    TEXT,
            frequency      TEXT NOT NULL,
            scheduled_time TEXT,
            created_at     TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS habit_completions (
            habit_id       TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
            completed_date TEXT NOT NULL,
            UNIQUE (habit_id, completed_date)
        );

        CREATE INDEX IF NOT EXISTS idx_habits_owner ON habits(owner_id);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: drop the cached streak table some early databases carry.
///
/// Streaks are always recomputed from completions, so a persisted copy
/// can only go stale.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch("DROP TABLE IF EXISTS habit_streaks;")?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}

/// Migration v3: part-of-day grouping and the rules a frequency edit
/// replaced.
///
/// A `habit_rule_history` row governs the habit's days before
/// `until_date`.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "ALTER TABLE habits ADD COLUMN time_of_day TEXT;

        CREATE TABLE IF NOT EXISTS habit_rule_history (
            habit_id   TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
            frequency  TEXT NOT NULL,
            until_date TEXT NOT NULL,
            PRIMARY KEY (habit_id, until_date)
        );",
    )?;
    set_schema_version(&tx, 3)?;
    tx.commit()
}
