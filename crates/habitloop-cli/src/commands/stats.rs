use clap::Subcommand;
use habitloop_core::Config;

use super::{open_tracker, print_json, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Streaks, completion count and completion rate of one habit
    Habit {
        /// Habit ID
        id: String,
        /// Only report on a habit of this owner
        #[arg(long)]
        owner: Option<String>,
        /// Day as YYYY-MM-DD (default: today)
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Share of due habits completed per day
    Progress {
        /// Filter by owner
        #[arg(long)]
        owner: Option<String>,
        /// Last day of the window (default: today)
        #[arg(long)]
        end: Option<String>,
        /// Window length (default: stats.progress_days)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Due / completed marks for each day of a range
    Calendar {
        /// Habit ID
        id: String,
        /// Only report on a habit of this owner
        #[arg(long)]
        owner: Option<String>,
        /// First day, YYYY-MM-DD
        #[arg(long)]
        from: String,
        /// Last day, YYYY-MM-DD
        #[arg(long)]
        to: String,
    },
}

pub fn run(action: StatsAction, config: &Config) -> CliResult {
    let tracker = open_tracker(config)?;

    match action {
        StatsAction::Habit { id, owner, as_of } => {
            print_json(&tracker.scoped(owner.as_deref()).habit_stats(&id, as_of.as_deref())?)?;
        }
        StatsAction::Progress { owner, end, days } => {
            let days = days.unwrap_or(config.stats.progress_days);
            print_json(&tracker.progress(owner.as_deref(), end.as_deref(), days)?)?;
        }
        StatsAction::Calendar { id, owner, from, to } => {
            print_json(&tracker.scoped(owner.as_deref()).calendar(&id, &from, &to)?)?;
        }
    }
    Ok(())
}
