//! ICMP echo prober.
//!
//! Sends a short burst of echo requests to a host and summarizes the replies.

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, SurgeError};
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};

use crate::probe::traits::serialize_error;
use crate::probe::{Outcome, Probe, ProbeError};

/// Default number of echo requests per host.
const DEFAULT_COUNT: u16 = 3;

/// Default delay between consecutive echo requests (1 second).
const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Default ceiling for the whole echo sequence (5 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Echo payload, same size as the classic `ping` default.
const ECHO_PAYLOAD: [u8; 56] = [0; 56];

fn default_count() -> u16 {
    DEFAULT_COUNT
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

/// Send offsets for `count` echoes spaced `interval` apart.
///
/// Offsets at or past `ceiling` are dropped, as is anything whose offset
/// would overflow.
fn echo_offsets(count: u16, interval: Duration, ceiling: Duration) -> Vec<Duration> {
    (0..u32::from(count))
        .map_while(|seq| interval.checked_mul(seq))
        .take_while(|offset| *offset < ceiling)
        .collect()
}

/// Configuration for the ICMP echo sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingConfig {
    /// Echo requests per host (default: 3).
    #[serde(default = "default_count")]
    pub count: u16,
    /// Delay between echo requests (default: 1s).
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    /// Total ceiling for the sequence (default: 5s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_COUNT,
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PingConfig {
    /// Set the number of echo requests.
    pub fn with_count(mut self, count: u16) -> Self {
        self.count = count;
        self
    }

    /// Set the delay between echo requests.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the total ceiling for the sequence.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Summary of one echo sequence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PingStats {
    pub packets_sent: u32,
    pub packets_received: u32,
    /// Lost share of sent packets, 0-100.
    pub packet_loss_percent: f64,
    /// Mean round trip of received packets; zero when none came back.
    pub avg_rtt: Duration,
}

impl PingStats {
    /// Summarize `sent` requests given the round trips of the replies.
    pub fn from_samples(sent: u32, rtts: &[Duration]) -> Self {
        let received = u32::try_from(rtts.len()).unwrap_or(u32::MAX).min(sent);
        let packet_loss_percent = if sent == 0 {
            0.0
        } else {
            f64::from(sent - received) / f64::from(sent) * 100.0
        };
        let avg_rtt = if rtts.is_empty() {
            Duration::ZERO
        } else {
            rtts.iter().sum::<Duration>() / u32::try_from(rtts.len()).unwrap_or(u32::MAX)
        };

        Self {
            packets_sent: sent,
            packets_received: received,
            packet_loss_percent,
            avg_rtt,
        }
    }
}

/// Result of pinging one host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PingOutcome {
    pub url: String,
    /// Host name actually probed (scheme and `www.` stripped).
    pub domain: String,
    pub packets_sent: u32,
    pub packets_received: u32,
    pub packet_loss_percent: f64,
    #[serde(with = "humantime_serde")]
    pub avg_rtt: Duration,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<ProbeError>,
}

impl PingOutcome {
    /// Successful outcome carrying measured statistics.
    pub fn measured(url: impl Into<String>, domain: impl Into<String>, stats: PingStats) -> Self {
        Self {
            url: url.into(),
            domain: domain.into(),
            packets_sent: stats.packets_sent,
            packets_received: stats.packets_received,
            packet_loss_percent: stats.packet_loss_percent,
            avg_rtt: stats.avg_rtt,
            error: None,
        }
    }

    /// Errored outcome; all counters stay zero.
    pub fn errored(url: impl Into<String>, domain: impl Into<String>, error: ProbeError) -> Self {
        Self {
            url: url.into(),
            domain: domain.into(),
            packets_sent: 0,
            packets_received: 0,
            packet_loss_percent: 0.0,
            avg_rtt: Duration::ZERO,
            error: Some(error),
        }
    }
}

impl Outcome for PingOutcome {
    fn url(&self) -> &str {
        &self.url
    }

    fn error(&self) -> Option<&ProbeError> {
        self.error.as_ref()
    }

    fn failed(url: &str, error: ProbeError) -> Self {
        Self::errored(url, strip_domain(url), error)
    }
}

/// Derive the probe target from a configured URL.
///
/// Strips a literal `https://` or `http://` prefix, then a literal `www.`
/// prefix. Anything else passes through unchanged; this is not URL parsing.
pub fn strip_domain(url: &str) -> &str {
    let host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(url);

    host.strip_prefix("www.")
        .filter(|rest| !rest.is_empty())
        .unwrap_or(host)
}

/// Resolve hostname to IP address.
async fn resolve_host(host: &str) -> Result<IpAddr, std::io::Error> {
    // First, try to parse as an IP address directly
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs = tokio::net::lookup_host(format!("{host}:0")).await?;
    addrs
        .into_iter()
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"))
}

/// ICMP echo prober.
///
/// Each call resolves the host, opens its own ICMP client and runs one echo
/// sequence, so concurrent calls share nothing.
#[derive(Debug, Clone, Default)]
pub struct PingProber {
    config: PingConfig,
}

impl PingProber {
    /// Create a new prober with the given configuration.
    pub fn new(config: PingConfig) -> Self {
        Self { config }
    }

    /// Get the prober's configuration.
    pub fn config(&self) -> &PingConfig {
        &self.config
    }

    /// Run the echo sequence against a resolved address.
    ///
    /// Requests go out every `interval` without waiting for earlier replies.
    /// Requests scheduled past the ceiling are never sent; replies still
    /// outstanding at the ceiling count as lost.
    async fn echo_sequence(&self, ip: IpAddr) -> Result<PingStats, ProbeError> {
        let client = match ip {
            IpAddr::V4(_) => Client::new(&Config::default()),
            IpAddr::V6(_) => Client::new(&Config::builder().kind(ICMP::V6).build()),
        }
        .map_err(|e| ProbeError::ProbeRun(format!("failed to create ICMP client: {e}")))?;

        let ceiling = self.config.timeout;
        let deadline = Instant::now() + ceiling;
        let identifier: u16 = rand::random();

        // Tasks own a `Pinger` only; dropping any `Client` clone shuts the
        // shared reply map down for every other clone.
        let mut echoes = JoinSet::new();
        let mut sent = 0u32;
        let offsets = echo_offsets(self.config.count, self.config.interval, ceiling);
        for (seq, offset) in (0u16..).zip(offsets) {
            sent += 1;

            let mut pinger = client.pinger(ip, PingIdentifier(identifier)).await;
            pinger.timeout(ceiling);
            echoes.spawn(async move {
                tokio::time::sleep(offset).await;
                pinger.ping(PingSequence(seq), &ECHO_PAYLOAD).await
            });
        }

        let mut rtts = Vec::with_capacity(sent as usize);
        let mut failure = None;
        let drained = timeout_at(deadline, async {
            while let Some(joined) = echoes.join_next().await {
                match joined {
                    Ok(Ok((_, rtt))) => rtts.push(rtt),
                    Ok(Err(SurgeError::Timeout { .. })) => {
                        tracing::debug!(%ip, "Echo reply lost");
                    }
                    Ok(Err(e)) => {
                        failure = Some(e.to_string());
                        break;
                    }
                    Err(e) => {
                        failure = Some(format!("echo task failed: {e}"));
                        break;
                    }
                }
            }
        })
        .await;

        if drained.is_err() {
            tracing::debug!(%ip, ceiling_ms = ceiling.as_millis(), "Echo sequence hit ceiling");
        }
        echoes.abort_all();

        if let Some(message) = failure {
            return Err(ProbeError::ProbeRun(message));
        }

        Ok(PingStats::from_samples(sent, &rtts))
    }
}

#[async_trait::async_trait]
impl Probe for PingProber {
    type Outcome = PingOutcome;

    fn kind(&self) -> &'static str {
        "ping"
    }

    async fn probe(&self, url: &str) -> PingOutcome {
        let domain = strip_domain(url);

        let ip = match resolve_host(domain).await {
            Ok(ip) => ip,
            Err(e) => {
                tracing::warn!(url = %url, domain = %domain, error = %e, "Failed to resolve host");
                return PingOutcome::errored(
                    url,
                    domain,
                    ProbeError::Resolve {
                        host: domain.to_string(),
                        message: e.to_string(),
                    },
                );
            }
        };

        match self.echo_sequence(ip).await {
            Ok(stats) => {
                tracing::debug!(
                    url = %url,
                    %ip,
                    sent = stats.packets_sent,
                    received = stats.packets_received,
                    avg_rtt_ms = stats.avg_rtt.as_secs_f64() * 1000.0,
                    "Ping probe complete"
                );
                PingOutcome::measured(url, domain, stats)
            }
            Err(e) => {
                tracing::warn!(url = %url, %ip, error = %e, "Ping probe failed");
                PingOutcome::errored(url, domain, e)
            }
        }
    }
}
