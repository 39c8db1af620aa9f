use agent_watchdog::{ErrorTriplet, LoopDetection, NonRetryableDetection, ToolCall, Watchdog};
use anyhow::Context;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Recorded windows read from stdin
#[derive(Debug, Default, Deserialize)]
struct Windows {
    #[serde(default)]
    calls: Vec<ToolCall>,
    #[serde(default)]
    errors: Vec<ErrorTriplet>,
}

/// Verdicts written to stdout
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    #[serde(rename = "loop")]
    loop_detection: Option<LoopDetection>,
    non_retryable: Option<NonRetryableDetection>,
}

fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenv().ok();

    init_logging();

    let watchdog = Watchdog::from_env();
    debug!(config = ?watchdog.config(), "Watchdog config loaded");

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;

    let windows: Windows = if input.trim().is_empty() {
        Windows::default()
    } else {
        serde_json::from_str(&input).context("failed to parse windows JSON")?
    };
    info!(
        calls = windows.calls.len(),
        errors = windows.errors.len(),
        "Checking recorded windows"
    );

    let report = Report {
        loop_detection: watchdog.check_calls(&windows.calls),
        non_retryable: watchdog.check_errors(&windows.errors),
    };

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &report).context("failed to write report")?;
    writeln!(stdout)?;
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
