//! Presentation order for collected outcomes.
//!
//! Both orders put errored outcomes after every successful one, then rank
//! successes worst-first so outliers surface at the top. Sorting is stable,
//! so ties keep their collection order.

use std::cmp::Ordering;

use crate::probe::Outcome;
use crate::probe::http::FetchOutcome;
use crate::probe::ping::PingOutcome;

/// Successful outcomes before errored ones.
fn errors_last<O: Outcome>(a: &O, b: &O) -> Ordering {
    a.error().is_some().cmp(&b.error().is_some())
}

/// Order ping outcomes: errors last, then slowest average round trip first.
pub fn rank_ping(outcomes: &mut [PingOutcome]) {
    outcomes.sort_by(|a, b| errors_last(a, b).then_with(|| b.avg_rtt.cmp(&a.avg_rtt)));
}

/// Order fetch outcomes: errors last, then largest body first.
pub fn rank_fetch(outcomes: &mut [FetchOutcome]) {
    outcomes.sort_by(|a, b| {
        errors_last(a, b).then_with(|| b.body_size_mb.total_cmp(&a.body_size_mb))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeError;
    use crate::probe::ping::PingStats;
    use std::time::Duration;

    fn ping_ok(url: &str, rtt_ms: u64) -> PingOutcome {
        PingOutcome::measured(
            url,
            url,
            PingStats::from_samples(3, &[Duration::from_millis(rtt_ms); 3]),
        )
    }

    fn ping_err(url: &str) -> PingOutcome {
        PingOutcome::failed(url, ProbeError::ProbeRun("permission denied".into()))
    }

    fn fetch_ok(url: &str, bytes: u64) -> FetchOutcome {
        FetchOutcome::fetched(url, 200, bytes, Vec::new())
    }

    fn fetch_err(url: &str) -> FetchOutcome {
        FetchOutcome::failed(
            url,
            ProbeError::Request {
                url: url.into(),
                message: "connection refused".into(),
            },
        )
    }

    fn urls<O: Outcome>(outcomes: &[O]) -> Vec<&str> {
        outcomes.iter().map(|o| o.url()).collect()
    }

    #[test]
    fn test_ping_slowest_first() {
        let mut outcomes = vec![ping_ok("a", 10), ping_ok("b", 50), ping_ok("c", 30)];
        rank_ping(&mut outcomes);
        assert_eq!(urls(&outcomes), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_ping_errors_last() {
        let mut outcomes = vec![ping_err("x"), ping_ok("a", 1), ping_err("y"), ping_ok("b", 2)];
        rank_ping(&mut outcomes);

        assert_eq!(&urls(&outcomes)[..2], &["b", "a"]);
        assert!(outcomes[2..].iter().all(|o| o.error.is_some()));
    }

    #[test]
    fn test_ping_error_with_zero_stats_never_beats_success() {
        // A zero-RTT success still outranks errors
        let mut outcomes = vec![ping_err("x"), ping_ok("a", 0)];
        rank_ping(&mut outcomes);
        assert_eq!(urls(&outcomes), vec!["a", "x"]);
    }

    #[test]
    fn test_ping_ties_keep_collection_order() {
        let mut outcomes = vec![ping_ok("a", 20), ping_ok("b", 20), ping_ok("c", 20)];
        rank_ping(&mut outcomes);
        assert_eq!(urls(&outcomes), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_fetch_largest_first() {
        let mut outcomes = vec![
            fetch_ok("small", 1_024),
            fetch_ok("large", 4 * 1_048_576),
            fetch_ok("medium", 1_048_576),
        ];
        rank_fetch(&mut outcomes);
        assert_eq!(urls(&outcomes), vec!["large", "medium", "small"]);
    }

    #[test]
    fn test_fetch_errors_last() {
        let mut outcomes = vec![fetch_err("x"), fetch_ok("a", 0), fetch_ok("b", 10)];
        rank_fetch(&mut outcomes);
        assert_eq!(urls(&outcomes), vec!["b", "a", "x"]);
    }

    #[test]
    fn test_rank_empty() {
        let mut pings: Vec<PingOutcome> = Vec::new();
        rank_ping(&mut pings);
        let mut fetches: Vec<FetchOutcome> = Vec::new();
        rank_fetch(&mut fetches);
        assert!(pings.is_empty() && fetches.is_empty());
    }
}
