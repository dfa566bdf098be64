//! Cadre CLI
//!
//! # Usage
//! ```bash
//! cadre teams
//! cadre plan --team bakery --goal "daily operations"
//! cadre run --config team.toml --goal "review PR" --context pr.json --status
//! cadre watch --config team.toml --goal "daily maintenance" --every 60 --runs 3
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod goal_job;

/// Cadre - delegate goals to teams of workers and run them on a schedule
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in team types and worker kinds
    Teams,

    /// Show the tasks a team type would plan for a goal
    Plan {
        /// Team type, e.g. bakery
        #[arg(long)]
        team: String,

        /// Goal text
        #[arg(long)]
        goal: String,

        /// JSON file with the goal context
        #[arg(long, value_name = "FILE")]
        context: Option<PathBuf>,

        /// JSON file with playbook settings
        #[arg(long, value_name = "FILE")]
        settings: Option<PathBuf>,
    },

    /// Build a team from a config file and execute one goal
    Run {
        /// Team config (.toml or .json)
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Goal text
        #[arg(long)]
        goal: String,

        /// JSON file with the goal context
        #[arg(long, value_name = "FILE")]
        context: Option<PathBuf>,

        /// Also print the team status
        #[arg(long)]
        status: bool,
    },

    /// Re-execute a goal on a fixed interval
    Watch {
        /// Team config (.toml or .json)
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Goal text
        #[arg(long)]
        goal: String,

        /// JSON file with the goal context
        #[arg(long, value_name = "FILE")]
        context: Option<PathBuf>,

        /// Seconds between runs
        #[arg(long, default_value = "60")]
        every: u64,

        /// Stop after this many runs (default: until Ctrl+C)
        #[arg(long)]
        runs: Option<u64>,

        /// Scheduler config (.toml or .json)
        #[arg(long, value_name = "FILE")]
        scheduler: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Teams => commands::teams(),
        Commands::Plan {
            team,
            goal,
            context,
            settings,
        } => commands::plan(&team, &goal, context.as_deref(), settings.as_deref()),
        Commands::Run {
            config,
            goal,
            context,
            status,
        } => commands::run(&config, &goal, context.as_deref(), status).await,
        Commands::Watch {
            config,
            goal,
            context,
            every,
            runs,
            scheduler,
        } => {
            commands::watch(commands::WatchArgs {
                config,
                goal,
                context,
                every,
                runs,
                scheduler,
            })
            .await
        }
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}
