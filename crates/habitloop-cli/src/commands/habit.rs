//! Habit management and completion commands for CLI.

use clap::Subcommand;
use habitloop_core::habit::dates::{format_day, parse_created_at};
use habitloop_core::{Config, Frequency, HabitUpdate, NewHabit, TimeOfDay};

use super::{open_tracker, print_json, CliResult};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a new habit
    Create {
        /// Habit name
        name: String,
        /// Recurrence: daily, weekly or monthly
        #[arg(long, default_value = "daily")]
        frequency: String,
        /// Owner of the habit
        #[arg(long, default_value = "local")]
        owner: String,
        /// Habit description
        #[arg(long)]
        description: Option<String>,
        /// Time of day, e.g. "07:30" (sort key only)
        #[arg(long)]
        time: Option<String>,
        /// Agenda group: morning, afternoon or evening
        #[arg(long)]
        time_of_day: Option<String>,
        /// Creation day or date-time (default: today)
        #[arg(long)]
        created_at: Option<String>,
    },
    /// List habits
    List {
        /// Filter by owner
        #[arg(long)]
        owner: Option<String>,
    },
    /// Get habit details
    Get {
        /// Habit ID
        id: String,
        /// Only act on a habit of this owner
        #[arg(long)]
        owner: Option<String>,
    },
    /// Update a habit
    Update {
        /// Habit ID
        id: String,
        /// Only act on a habit of this owner
        #[arg(long)]
        owner: Option<String>,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New recurrence
        #[arg(long)]
        frequency: Option<String>,
        /// New time of day
        #[arg(long)]
        time: Option<String>,
        /// New agenda group
        #[arg(long)]
        time_of_day: Option<String>,
    },
    /// Delete a habit and its completions
    Delete {
        /// Habit ID
        id: String,
        /// Only act on a habit of this owner
        #[arg(long)]
        owner: Option<String>,
    },
    /// Mark or unmark a day as done and print the new streaks
    Toggle {
        /// Habit ID
        id: String,
        /// Only act on a habit of this owner
        #[arg(long)]
        owner: Option<String>,
        /// Day as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Print current and longest streak
    Streaks {
        /// Habit ID
        id: String,
        /// Only act on a habit of this owner
        #[arg(long)]
        owner: Option<String>,
        /// Day as YYYY-MM-DD (default: today)
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Check whether a habit is due on a day
    Due {
        /// Habit ID
        id: String,
        /// Only act on a habit of this owner
        #[arg(long)]
        owner: Option<String>,
        /// Day as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
}

pub fn run(action: HabitAction, config: &Config) -> CliResult {
    let tracker = open_tracker(config)?;

    match action {
        HabitAction::Create {
            name,
            frequency,
            owner,
            description,
            time,
            time_of_day,
            created_at,
        } => {
            let created_at = created_at.as_deref().map(parse_created_at).transpose()?;
            let habit = tracker.create_habit(NewHabit {
                owner_id: owner,
                name,
                description,
                frequency: frequency.parse::<Frequency>()?,
                time_of_day: time_of_day.map(|t| t.parse::<TimeOfDay>()).transpose()?,
                scheduled_time: time,
                created_at,
            })?;
            print_json(&habit)?;
        }
        HabitAction::List { owner } => {
            print_json(&tracker.list_habits(owner.as_deref())?)?;
        }
        HabitAction::Get { id, owner } => {
            print_json(&tracker.scoped(owner.as_deref()).get_habit(&id)?)?;
        }
        HabitAction::Update {
            id,
            owner,
            name,
            description,
            frequency,
            time,
            time_of_day,
        } => {
            let update = HabitUpdate {
                name,
                description,
                frequency: frequency.map(|f| f.parse::<Frequency>()).transpose()?,
                time_of_day: time_of_day.map(|t| t.parse::<TimeOfDay>()).transpose()?,
                scheduled_time: time,
            };
            print_json(&tracker.scoped(owner.as_deref()).update_habit(&id, update)?)?;
        }
        HabitAction::Delete { id, owner } => {
            tracker.scoped(owner.as_deref()).delete_habit(&id)?;
            println!("Habit deleted: {id}");
        }
        HabitAction::Toggle { id, owner, date } => {
            let date = date.unwrap_or_else(|| format_day(tracker.today()));
            print_json(&tracker.scoped(owner.as_deref()).toggle_completion(&id, &date)?)?;
        }
        HabitAction::Streaks { id, owner, as_of } => {
            print_json(&tracker.scoped(owner.as_deref()).get_streaks(&id, as_of.as_deref())?)?;
        }
        HabitAction::Due { id, owner, date } => {
            let habit = tracker.scoped(owner.as_deref()).get_habit(&id)?;
            let due = tracker.is_due_today(&habit, date.as_deref())?;
            print_json(&serde_json::json!({ "habit_id": habit.id, "due": due }))?;
        }
    }
    Ok(())
}
