//! Webdash Binary Entry Point
//!
//! Loads the website list, runs the ping and fetch phases, and prints the
//! ranked results. Core functionality is provided by the `webdash` library.

use std::io::Write;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webdash::{
    AppConfig, Dashboard,
    config::{DEFAULT_CONFIG_FILE, parse_duration},
    render::{render_json, render_text},
};

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Plain-text tables
    Table,
    /// Pretty-printed JSON
    Json,
}

/// Webdash - ping and fetch a list of websites concurrently
#[derive(Parser, Debug)]
#[command(name = "webdash", version, about, long_about = None)]
struct Cli {
    /// Path to the websites file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, env = "WEBDASH_CONFIG")]
    config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Ping sequence ceiling per host (overrides config file)
    #[arg(long, value_parser = parse_duration, env = "WEBDASH_PING_TIMEOUT")]
    ping_timeout: Option<Duration>,

    /// Per-request fetch timeout (overrides config file)
    #[arg(long, value_parser = parse_duration, env = "WEBDASH_FETCH_TIMEOUT")]
    fetch_timeout: Option<Duration>,

    /// Maximum redirects followed per host (overrides config file)
    #[arg(long, env = "WEBDASH_MAX_REDIRECTS")]
    max_redirects: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so the report on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,webdash=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    tracing::info!("Loading websites from: {}", cli.config);
    let mut config = AppConfig::load(&cli.config)?;

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(timeout) = cli.ping_timeout {
        config.ping.timeout = timeout;
    }
    if let Some(timeout) = cli.fetch_timeout {
        config.fetch.timeout = timeout;
    }
    if let Some(max_redirects) = cli.max_redirects {
        config.fetch.max_redirects = max_redirects;
    }
    config.validate()?;

    tracing::info!(
        websites = config.websites.len(),
        ping_timeout = %humantime::format_duration(config.ping.timeout),
        fetch_timeout = %humantime::format_duration(config.fetch.timeout),
        max_redirects = config.fetch.max_redirects,
        "Configuration loaded"
    );

    let dashboard = Dashboard::from_config(&config)?;
    let report = dashboard.run(&config.urls()).await;

    let mut stdout = std::io::stdout().lock();
    match cli.format {
        Format::Table => render_text(&report, &mut stdout)?,
        Format::Json => render_json(&report, &mut stdout)?,
    }
    stdout.flush()?;

    Ok(())
}
