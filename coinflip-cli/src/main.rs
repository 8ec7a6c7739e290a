mod commands;
mod config;

use clap::{Parser, Subcommand};
use coinflip_core::CoinFlipError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "coinflip")]
#[command(about = "Two-player turn-based coin flip")]
#[command(version)]
struct Cli {
    /// JSON config file (defaults to <config dir>/coinflip/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a room and play
    Play(commands::PlayArgs),
    /// Show which player and room would be used
    Identity(commands::IdentityArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "coinflip={},coinflip_core={}",
            log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            report(&e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Play(args) => commands::play(args, config).await,
        Commands::Identity(args) => commands::show_identity(args, &config),
    };

    if let Err(e) = result {
        report(&e);
        std::process::exit(1);
    }

    Ok(())
}

fn report(error: &anyhow::Error) {
    match error.downcast_ref::<CoinFlipError>() {
        Some(CoinFlipError::Config(msg)) => {
            eprintln!("Error: Invalid configuration: {}", msg);
            eprintln!("Check your config file or the --server flag");
        }
        Some(CoinFlipError::InvalidUrl(e)) => {
            eprintln!("Error: Invalid server URL: {}", e);
        }
        _ => {
            eprintln!("Error: {:#}", error);
        }
    }
}
