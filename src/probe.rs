//! Probe Layer
//!
//! Per-host units of work and the machinery that runs them in parallel.
//! Each unit runs in its own Tokio task and reports exactly one outcome.
//!
//! # Architecture
//!
//! - [`Probe`]: Core trait for a unit of work against one host URL
//! - [`ping::PingProber`]: ICMP echo sequence
//! - [`http::Fetcher`]: HTTP GET with manual redirect following
//! - [`collect_all`]: Fan-in that gathers one outcome per host
//! - [`rank_ping`] / [`rank_fetch`]: Presentation order for collected outcomes
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use webdash::probe::{collect_all, rank_ping, ping::{PingConfig, PingProber}};
//!
//! # async fn run() {
//! let prober = Arc::new(PingProber::new(PingConfig::default()));
//! let urls = vec!["https://example.com".to_string()];
//! let mut outcomes = collect_all(prober, &urls, Duration::from_secs(10)).await;
//! rank_ping(&mut outcomes);
//! # }
//! ```

mod fanin;
pub mod http;
pub mod ping;
mod rank;
mod traits;

pub use fanin::collect_all;
pub use rank::{rank_fetch, rank_ping};
pub use traits::{Outcome, Probe, ProbeError, SetupError};
