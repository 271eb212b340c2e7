//! Viddex CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use viddex::cli::{commands, Cli, Commands};
use viddex::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("viddex={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Ensure the data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Process { input, user, title } => {
            commands::run_process(input, user, title.clone(), settings).await?;
        }

        Commands::Retry { video_id, user } => {
            commands::run_retry(video_id, user, settings).await?;
        }

        Commands::Delete { video_id, user } => {
            commands::run_delete(video_id, user, settings).await?;
        }

        Commands::PurgeUser { user_id } => {
            commands::run_purge_user(user_id, settings).await?;
        }

        Commands::List { user } => {
            commands::run_list(user, settings).await?;
        }

        Commands::Status { video_id, user } => {
            commands::run_status(video_id, user, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &settings)?;
        }
    }

    Ok(())
}
