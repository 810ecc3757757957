//! Two-phase run: ping every host, then fetch every host.
//!
//! Each phase fans out one unit per host, waits for all of them, ranks the
//! outcomes and records its wall-clock duration. The fetch phase only starts
//! once every ping outcome has been collected.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AppConfig;
use crate::probe::http::{FetchConfig, FetchOutcome, Fetcher};
use crate::probe::ping::{PingConfig, PingOutcome, PingProber};
use crate::probe::{Probe, SetupError, collect_all, rank_fetch, rank_ping};

/// Slack added on top of a unit's own timeouts before the fan-in gives up on it.
pub const DEADLINE_GRACE: Duration = Duration::from_secs(5);

/// Per-unit deadline for the ping phase.
///
/// Covers DNS resolution plus the echo sequence ceiling.
pub fn ping_deadline(config: &PingConfig) -> Duration {
    config.timeout.saturating_add(DEADLINE_GRACE)
}

/// Per-unit deadline for the fetch phase.
///
/// Every hop of a maximal redirect chain may use its full request timeout.
pub fn fetch_deadline(config: &FetchConfig) -> Duration {
    let hops = u32::try_from(config.max_redirects.saturating_add(1)).unwrap_or(u32::MAX);
    config
        .timeout
        .saturating_mul(hops)
        .saturating_add(DEADLINE_GRACE)
}

/// Ranked results of one dashboard run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// When the ping phase started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the ping phase.
    #[serde(with = "humantime_serde")]
    pub ping_elapsed: Duration,
    /// Wall-clock duration of the fetch phase.
    #[serde(with = "humantime_serde")]
    pub fetch_elapsed: Duration,
    /// Ping outcomes, errors last, slowest first.
    pub ping: Vec<PingOutcome>,
    /// Fetch outcomes, errors last, largest first.
    pub fetch: Vec<FetchOutcome>,
}

impl Report {
    /// Whether any fetch followed at least one redirect.
    pub fn has_redirects(&self) -> bool {
        self.fetch.iter().any(FetchOutcome::was_redirected)
    }

    /// Combined duration of both phases.
    pub fn total_elapsed(&self) -> Duration {
        self.ping_elapsed + self.fetch_elapsed
    }
}

/// Runs the ping phase and the fetch phase over a host list.
pub struct Dashboard<P = PingProber, F = Fetcher> {
    pinger: Arc<P>,
    fetcher: Arc<F>,
    ping_deadline: Duration,
    fetch_deadline: Duration,
}

impl Dashboard {
    /// Build the ICMP prober and HTTP fetcher described by `config`.
    ///
    /// # Errors
    /// Returns `SetupError` if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, SetupError> {
        let fetcher = Fetcher::new(config.fetch.clone())?;
        let pinger = PingProber::new(config.ping.clone());

        Ok(Self::new(
            pinger,
            fetcher,
            ping_deadline(&config.ping),
            fetch_deadline(&config.fetch),
        ))
    }
}

impl<P, F> Dashboard<P, F>
where
    P: Probe<Outcome = PingOutcome>,
    F: Probe<Outcome = FetchOutcome>,
{
    /// Create a dashboard from explicit probes and per-unit deadlines.
    pub fn new(pinger: P, fetcher: F, ping_deadline: Duration, fetch_deadline: Duration) -> Self {
        Self {
            pinger: Arc::new(pinger),
            fetcher: Arc::new(fetcher),
            ping_deadline,
            fetch_deadline,
        }
    }

    /// Ping every host, then fetch every host, and rank both result sets.
    ///
    /// Always returns exactly one ping and one fetch outcome per URL.
    pub async fn run(&self, urls: &[String]) -> Report {
        let started_at = Utc::now();

        tracing::info!(hosts = urls.len(), "Pinging hosts");
        let start = Instant::now();
        let mut ping = collect_all(Arc::clone(&self.pinger), urls, self.ping_deadline).await;
        rank_ping(&mut ping);
        let ping_elapsed = start.elapsed();

        tracing::info!(hosts = urls.len(), "Fetching host content");
        let start = Instant::now();
        let mut fetch = collect_all(Arc::clone(&self.fetcher), urls, self.fetch_deadline).await;
        rank_fetch(&mut fetch);
        let fetch_elapsed = start.elapsed();

        tracing::info!(
            ping_ms = ping_elapsed.as_millis(),
            fetch_ms = fetch_elapsed.as_millis(),
            ping_failures = ping.iter().filter(|o| o.error.is_some()).count(),
            fetch_failures = fetch.iter().filter(|o| o.error.is_some()).count(),
            "Dashboard run complete"
        );

        Report {
            started_at,
            ping_elapsed,
            fetch_elapsed,
            ping,
            fetch,
        }
    }
}
