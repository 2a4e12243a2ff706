//! Command-line interface for airsafe.

pub mod args;
mod commands;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::app::{App, AppError};
use crate::config::Config;
use crate::ingest::IngestError;
use crate::logging::init_tracing;

pub use args::{write_output, GlobalArgs};
pub use commands::{BackfillCommand, InspectCommand, RefreshArgs, ServeArgs};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during CLI execution.
#[derive(Debug, Error)]
pub enum CliError {
    /// App error.
    #[error("{0}")]
    App(#[from] AppError),

    /// Ingestion error.
    #[error("{0}")]
    Ingest(#[from] IngestError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crate::store::StoreError> for CliError {
    fn from(e: crate::store::StoreError) -> Self {
        CliError::App(e.into())
    }
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

// =============================================================================
// CLI Definition
// =============================================================================

/// airsafe - Ghana air-quality ingestion and API service.
#[derive(Parser, Debug)]
#[command(name = "airsafe", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API and the refresh scheduler.
    Serve(ServeArgs),

    /// Fetch the latest measurements for one location or all of them.
    Refresh(RefreshArgs),

    /// Load locations, sensors or measurement history from OpenAQ.
    Backfill {
        #[command(subcommand)]
        command: BackfillCommand,
    },

    /// Inspect stored data.
    Inspect {
        #[command(subcommand)]
        command: InspectCommand,
    },

    /// Show store statistics.
    Stats,
}

// =============================================================================
// CLI Execution
// =============================================================================

impl Cli {
    /// Parse command-line arguments and return the CLI instance.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let mut ctx = self.global.to_app_context();
        ctx.on_config = Some(init_logging);
        let app = App::new(ctx)?;

        match self.command {
            Command::Serve(args) => args.run(app).await,
            Command::Refresh(args) => args.run(&app, &self.global).await,
            Command::Backfill { command } => command.run(&app, &self.global).await,
            Command::Inspect { command } => command.run(&app, &self.global).await,
            Command::Stats => commands::run_stats(&app, &self.global).await,
        }
    }
}

fn init_logging(config: &Config) {
    init_tracing(&config.logging.filter);
}

/// Main entry point for the CLI.
pub async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli.run().await
}
