pub mod config;
pub mod habit;
pub mod stats;
pub mod today;

use habitloop_core::storage::{open_store, Store};
use habitloop_core::{Config, HabitTracker};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the tracker over the backend selected in the config.
pub fn open_tracker(config: &Config) -> Result<HabitTracker<Box<dyn Store>>, Box<dyn std::error::Error>> {
    let store = open_store(config)?;
    Ok(HabitTracker::new(store))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
