use clap::Args;
use habitloop_core::Config;

use super::{open_tracker, print_json, CliResult};

/// Habits due on a day, in scheduled order
#[derive(Args)]
pub struct TodayArgs {
    /// Filter by owner
    #[arg(long)]
    owner: Option<String>,
    /// Day as YYYY-MM-DD (default: today)
    #[arg(long)]
    date: Option<String>,
}

pub fn run(args: TodayArgs, config: &Config) -> CliResult {
    let tracker = open_tracker(config)?;
    print_json(&tracker.agenda(args.owner.as_deref(), args.date.as_deref())?)
}
