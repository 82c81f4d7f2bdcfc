use clap::{Parser, Subcommand};
use habitloop_core::Config;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "habitloop", version, about = "Habitloop CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Habit management and completions
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Habits due on a day
    Today(commands::today::TodayArgs),
    /// Habit statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load_or_default();
    logging::init(&config.logging);

    let result = match cli.command {
        Commands::Habit { action } => commands::habit::run(action, &config),
        Commands::Today(args) => commands::today::run(args, &config),
        Commands::Stats { action } => commands::stats::run(action, &config),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
