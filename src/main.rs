//! Kurs CLI entry point.

use anyhow::Result;
use clap::Parser;
use kurs::cli::{commands, Cli, Commands};
use kurs::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&Settings::expand_path(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging
    let log_level = cli.log_level(&settings.general.log_level);

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("kurs={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match cli.command {
        Commands::Ingest { dir, clear } => {
            commands::run_ingest(dir, clear, settings).await?;
        }

        Commands::Ask { question } => {
            commands::run_ask(&question, settings).await?;
        }

        Commands::Chat => {
            commands::run_chat(settings).await?;
        }

        Commands::Search {
            query,
            course,
            lesson,
            limit,
        } => {
            commands::run_search(&query, course, lesson, limit, settings).await?;
        }

        Commands::Courses { course } => {
            commands::run_courses(course, settings).await?;
        }

        Commands::Reset { yes } => {
            commands::run_reset(yes, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, settings, cli.config.as_deref())?;
        }
    }

    Ok(())
}
