//! Core probe traits and types.

use std::time::Duration;

use serde::Serializer;
use thiserror::Error;

/// Failures a single unit of work can record in its outcome.
///
/// Every variant is unit-local: it is stored in the outcome of the host that
/// produced it and never aborts the batch. Messages are captured as strings so
/// outcomes stay cheap to clone and compare after collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Probe target could not be constructed (invalid or unresolvable host).
    #[error("failed to resolve '{host}': {message}")]
    Resolve { host: String, message: String },

    /// Echo sequence failed (socket permission, network unreachable).
    #[error("ping failed: {0}")]
    ProbeRun(String),

    /// GET failed at the initial request or at a redirect hop.
    #[error("request to '{url}' failed: {message}")]
    Request { url: String, message: String },

    /// Final response arrived but its body could not be read.
    #[error("failed to read body of {status} response: {message}")]
    BodyRead { status: u16, message: String },

    /// Redirect response without a usable `Location` header.
    #[error("{status} redirect without a Location header")]
    MissingLocation { status: u16 },

    /// `Location` header that does not form a valid URL.
    #[error("invalid redirect location '{location}': {message}")]
    InvalidLocation { location: String, message: String },

    /// Redirect chain exceeded the configured bound.
    #[error("too many redirects (limit {0})")]
    TooManyRedirects(usize),

    /// Unit did not finish before its deadline.
    #[error("timed out after {}", format_timeout(.0))]
    Timeout(Duration),

    /// Unit task terminated abnormally (panic or cancellation).
    #[error("probe task aborted: {0}")]
    Aborted(String),
}

/// Errors building a probe before any unit runs.
#[derive(Debug, Error)]
pub enum SetupError {
    /// HTTP client could not be constructed (TLS backend, invalid header).
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

fn format_timeout(timeout: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*timeout)
}

/// Serialize an optional error as its display string.
pub(crate) fn serialize_error<S>(
    error: &Option<ProbeError>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Result record produced by exactly one unit of work.
///
/// Outcomes are written once by their unit and handed to the fan-in
/// immutably. When an error is set, numeric measurements are zero and carry no
/// meaning.
pub trait Outcome: Send + 'static {
    /// URL of the host this outcome belongs to.
    fn url(&self) -> &str;

    /// Error recorded by the unit, if any.
    fn error(&self) -> Option<&ProbeError>;

    /// Build an errored outcome with zeroed measurements.
    ///
    /// Used by the fan-in when a unit never reports back on its own.
    fn failed(url: &str, error: ProbeError) -> Self;

    /// Whether the unit completed without error.
    fn is_success(&self) -> bool {
        self.error().is_none()
    }
}

/// A unit of work applied to one host URL.
///
/// Implementations must capture every failure inside the returned outcome;
/// the batch always reports one outcome per configured host.
#[async_trait::async_trait]
pub trait Probe: Send + Sync + 'static {
    /// Outcome type produced per host.
    type Outcome: Outcome;

    /// Short label for logs (e.g. "ping", "fetch").
    fn kind(&self) -> &'static str;

    /// Run the unit against a single host URL.
    async fn probe(&self, url: &str) -> Self::Outcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_is_human_readable() {
        let err = ProbeError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "timed out after 5s");
    }

    #[test]
    fn test_body_read_keeps_status_in_message() {
        let err = ProbeError::BodyRead {
            status: 200,
            message: "connection reset".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("200"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn test_serialize_error_as_string() {
        #[derive(serde::Serialize)]
        struct Wrapper {
            #[serde(serialize_with = "serialize_error")]
            error: Option<ProbeError>,
        }

        let json = serde_json::to_value(Wrapper {
            error: Some(ProbeError::TooManyRedirects(10)),
        })
        .unwrap();
        assert_eq!(json["error"], "too many redirects (limit 10)");

        let json = serde_json::to_value(Wrapper { error: None }).unwrap();
        assert!(json["error"].is_null());
    }
}
