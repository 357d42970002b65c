// src/main.rs

//! The main entry point for the redis-trib administrative tool.

use anyhow::Result;
use clap::Parser;
use redis_trib::cli::{Cli, GlobalOpts, LogFormat};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.global)?;
    redis_trib::commands::dispatch(cli.command).await
}

/// Wires the global flags into the tracing subscriber: `--debug` selects the
/// debug level and `--verbose` the default info level (RUST_LOG still wins
/// when set), `--log` redirects output to a file and `--log-format` switches
/// between the compact and JSON formats.
fn init_logging(opts: &GlobalOpts) -> Result<()> {
    let default_level = if opts.debug { "debug" } else { "info" };
    let filter = EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string()),
    );

    match &opts.log {
        None => match opts.log_format {
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .compact()
                .with_ansi(true)
                .init(),
            LogFormat::Json => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init(),
        },
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let writer = Arc::new(file);
            match opts.log_format {
                LogFormat::Text => tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .compact()
                    .with_ansi(false)
                    .with_writer(writer)
                    .init(),
                LogFormat::Json => tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .json()
                    .with_writer(writer)
                    .init(),
            }
        }
    }
    Ok(())
}
