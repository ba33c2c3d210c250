use clap::{Parser, Subcommand};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "commute", version, about = "Commute traffic estimates")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate both legs of the commute
    Estimate(commands::estimate::EstimateArgs),
    /// Record an observed travel time
    Observe(commands::observe::ObserveArgs),
    /// Show learned travel-time history
    History(commands::history::HistoryArgs),
    /// Daily, weekly and impact reports
    Report {
        #[command(subcommand)]
        action: commands::report::ReportAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Re-estimate periodically
    Watch(commands::watch::WatchArgs),
}

fn main() {
    logging::init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Estimate(args) => commands::estimate::run(args),
        Commands::Observe(args) => commands::observe::run(args),
        Commands::History(args) => commands::history::run(args),
        Commands::Report { action } => commands::report::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Watch(args) => commands::watch::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
