//! pipedeck - command-line console for the pipeline platform.
//!
//! Logs in against the platform API, keeps the session between runs, and
//! exposes pipelines, artifacts, the dashboard and cluster settings as
//! subcommands.

mod cli;
mod commands;
mod context;

use std::io;
use std::path::Path;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use context::Context;
use pipedeck_core::{ApiError, Navigation, SessionError};

/// Initialize the tracing subscriber for logging.
///
/// Returns the file writer's guard, which must live until exit so buffered
/// lines are flushed.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref())?;
    debug!(command = ?cli.command, "pipedeck starting");

    let mut ctx = Context::new(&cli)?;
    info!(api = %ctx.config.api_base_url, "Using API");

    let result = commands::run(&mut ctx, cli.command).await;

    if let Err(ref e) = result {
        // A 401 mid-command ends the session and routes to the login page
        if session_ended(e) {
            if let Some(navigation @ Navigation::Login { .. }) = ctx.router.navigations().pop() {
                eprintln!(
                    "Session ended. Run `pipedeck login` to continue ({})",
                    navigation.path()
                );
            }
        }
    }
    result
}

fn session_ended(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_unauthorized)
        || error
            .downcast_ref::<SessionError>()
            .is_some_and(SessionError::is_unauthorized)
}
