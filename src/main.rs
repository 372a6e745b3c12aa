use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::task::LocalSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod session;

use commands::{ConfigCommand, DietCommand, EntryCommand, ExportArgs, LogArgs, StatsArgs, WipeArgs};
use config::Config;
use session::SyncSession;

#[derive(Parser)]
#[command(name = "vitalog")]
#[command(version)]
#[command(about = "Food journal and diet tracker", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a meal
    Log(LogArgs),

    /// Manage logged food entries
    Entry(EntryCommand),

    /// Manage diets
    Diet(DietCommand),

    /// Show food log insights
    Stats(StatsArgs),

    /// Export all data as JSON
    Export(ExportArgs),

    /// Delete all data from the server
    Wipe(WipeArgs),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitalog=warn,vitalog_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // The sync controller runs on a LocalSet.
    let local = LocalSet::new();
    if let Err(e) = local.run_until(run()).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Log(args)) => {
            let session = SyncSession::connect(&config).await?;
            args.run(session).await?;
        }
        Some(Commands::Entry(cmd)) => {
            let session = SyncSession::connect(&config).await?;
            cmd.run(session).await?;
        }
        Some(Commands::Diet(cmd)) => {
            let session = SyncSession::connect(&config).await?;
            cmd.run(session).await?;
        }
        Some(Commands::Stats(args)) => {
            let session = SyncSession::connect(&config).await?;
            args.run(session).await?;
        }
        Some(Commands::Export(args)) => {
            let session = SyncSession::connect(&config).await?;
            args.run(session, &config).await?;
        }
        Some(Commands::Wipe(args)) => {
            args.check()?;
            let session = SyncSession::connect(&config).await?;
            args.run(session).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
