//! ticket-engine - command-line front end
//!
//! Parses arguments, loads layered settings, opens the store and hands the
//! command to its handler. Failures are reported as text on stderr, or as a
//! JSON outcome on stdout with `--json`. A missing row exits with status 2,
//! any other failure with status 1.

use anyhow::Context;
use clap::Parser;
use std::process;
use ticket_engine::Tracker;
use ticket_engine::cli::{Cli, OutputFormatter, handlers};
use ticket_engine::config::Settings;
use ticket_engine::core::Outcome;
use ticket_engine::error::TrackerError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let formatter = OutputFormatter::new(cli.json, cli.no_color);

    if let Err(e) = run(cli, &formatter).await {
        handle_error(&e, &formatter);
        process::exit(exit_code(&e));
    }
}

/// Logs go to stderr so `--json` output stays machine-readable
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        Some(EnvFilter::new("ticket_engine=debug,sqlx=warn"))
    } else {
        EnvFilter::try_from_default_env().ok()
    };

    if let Some(filter) = filter {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

async fn run(cli: Cli, formatter: &OutputFormatter) -> anyhow::Result<()> {
    let settings = Settings::load(cli.config.as_deref(), cli.database.as_deref())
        .context("Failed to load configuration")?;
    let tracker = Tracker::open(&settings)
        .await
        .with_context(|| format!("Failed to open database at {}", settings.database.url))?;

    let result = handlers::dispatch(cli.command, &tracker, formatter).await;
    tracker.database().close().await;
    result?;
    Ok(())
}

fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<TrackerError>() {
        Some(e) if e.is_not_found() => 2,
        _ => 1,
    }
}

fn handle_error(error: &anyhow::Error, formatter: &OutputFormatter) {
    // Engine failures keep their own message; setup failures show the chain
    let message = match error.downcast_ref::<TrackerError>() {
        Some(e) if error.chain().count() == 1 => e.to_string(),
        _ => format!("{error:#}"),
    };

    if formatter.is_json() {
        let outcome = Outcome::<()> {
            ok: false,
            message,
            data: None,
        };
        if formatter.print_json(&outcome).is_err() {
            eprintln!("{error:#}");
        }
    } else {
        formatter.error(&message);
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        eprintln!("\nDebug information:");
        eprintln!("{error:?}");
    }
}
