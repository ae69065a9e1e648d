//! CloudNest CLI entry point.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use cloudnest_core::config::ClientConfig;
use cloudnest_core::config::logging::LoggingConfig;
use cloudnest_core::error::AppError;
use cloudnest_service::DriveContext;

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::load(&cli.config_dir, &cli.env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config.logging);

    if let Err(e) = run(&cli, config).await {
        tracing::debug!(error = %e, kind = ?e.kind, "Command failed");
        output::print_error(&e.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, config: ClientConfig) -> Result<(), AppError> {
    let ctx = DriveContext::connect(config)?;
    cli.execute(&ctx).await
}

/// Initialize tracing/logging
///
/// Logs go to stderr so table and JSON output stay clean on stdout.
fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
