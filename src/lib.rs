//! Webdash - Concurrent Website Reachability Dashboard
//!
//! This crate pings and fetches a configured list of websites in parallel and
//! ranks the results for review. It can be used as a library, or run as a
//! standalone binary with the `webdash` executable.
//!
//! # Architecture
//!
//! - **Config**: YAML website list and probe settings
//! - **Probes**: ICMP echo prober and HTTP fetcher, one Tokio task per host
//! - **Fan-in**: Gathers exactly one outcome per host under a per-unit deadline
//! - **Ranking**: Errors last, worst performers and largest payloads first
//! - **Presentation**: Text tables or JSON
//!
//! # Example
//!
//! ```rust,no_run
//! use webdash::{AppConfig, Dashboard};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load("websites.yaml")?;
//!     let dashboard = Dashboard::from_config(&config)?;
//!
//!     let report = dashboard.run(&config.urls()).await;
//!     webdash::render::render_text(&report, &mut std::io::stdout())?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dashboard;
pub mod probe;
pub mod render;

pub use config::{AppConfig, ConfigError, Website};
pub use dashboard::{Dashboard, Report};
pub use probe::http::{FetchConfig, FetchOutcome, Fetcher};
pub use probe::ping::{PingConfig, PingOutcome, PingProber};
pub use probe::{Outcome, Probe, ProbeError, SetupError};
