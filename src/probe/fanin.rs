//! Fan-in of per-host units of work.
//!
//! One Tokio task per host, one MPSC channel sized to the host count, and a
//! single consumer that waits for exactly that many outcomes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::probe::{Outcome, Probe, ProbeError};

/// Run `probe` against every URL concurrently and collect one outcome each.
///
/// Each unit runs in its own task under `deadline`. A unit that overruns is
/// aborted and reported as [`ProbeError::Timeout`]; a unit that panics is
/// reported as [`ProbeError::Aborted`]. The returned outcomes are in the same
/// order as `urls`, whatever order the units finished in.
pub async fn collect_all<P: Probe>(
    probe: Arc<P>,
    urls: &[String],
    deadline: Duration,
) -> Vec<P::Outcome> {
    let total = urls.len();
    if total == 0 {
        return Vec::new();
    }

    let (tx, mut rx) = mpsc::channel(total);
    for (index, url) in urls.iter().enumerate() {
        let tx = tx.clone();
        let probe = Arc::clone(&probe);
        let url = url.clone();
        tokio::spawn(async move {
            let outcome = run_unit(probe, url, deadline).await;
            // Receiver only closes if the caller stopped waiting
            let _ = tx.send((index, outcome)).await;
        });
    }
    drop(tx);

    let mut slots: Vec<Option<P::Outcome>> = std::iter::repeat_with(|| None).take(total).collect();
    let mut received = 0;
    while received < total {
        let Some((index, outcome)) = rx.recv().await else {
            break;
        };
        slots[index] = Some(outcome);
        received += 1;
    }

    tracing::debug!(total, received, "Fan-in complete");

    slots
        .into_iter()
        .zip(urls)
        .map(|(slot, url)| {
            slot.unwrap_or_else(|| {
                P::Outcome::failed(url, ProbeError::Aborted("unit exited without reporting".into()))
            })
        })
        .collect()
}

/// Run one unit in its own task, bounded by `deadline`.
async fn run_unit<P: Probe>(probe: Arc<P>, url: String, deadline: Duration) -> P::Outcome {
    let kind = probe.kind();
    let mut task: JoinHandle<P::Outcome> = tokio::spawn({
        let url = url.clone();
        async move { probe.probe(&url).await }
    });

    match tokio::time::timeout(deadline, &mut task).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            tracing::error!(kind, url = %url, error = %e, "Probe task aborted");
            P::Outcome::failed(&url, ProbeError::Aborted(e.to_string()))
        }
        Err(_) => {
            task.abort();
            tracing::warn!(
                kind,
                url = %url,
                deadline_ms = deadline.as_millis(),
                "Probe exceeded deadline"
            );
            P::Outcome::failed(&url, ProbeError::Timeout(deadline))
        }
    }
}
