//! Ping probes for measuring host reachability via ICMP.
//!
//! - [`PingProber`]: ICMP echo sequence per host, reported as a [`PingOutcome`]

mod prober;

pub use prober::{PingConfig, PingOutcome, PingProber, PingStats, strip_domain};
