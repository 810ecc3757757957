//! HTTP content fetcher.
//!
//! Issues a GET, follows 301/302 responses by hand so every hop is recorded,
//! and measures the size of the final body.

use std::time::Duration;

use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{Client, Response, StatusCode, redirect};
use serde::{Deserialize, Serialize};

use crate::probe::traits::serialize_error;
use crate::probe::{Outcome, Probe, ProbeError, SetupError};

/// Default per-request timeout (10 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on followed redirects.
const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Bytes in one reported megabyte (MiB).
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_max_redirects() -> usize {
    DEFAULT_MAX_REDIRECTS
}

/// Raw `Location` value of a redirect response.
///
/// An absent or empty header is `MissingLocation`; one that is not valid
/// UTF-8 is `InvalidLocation`.
fn redirect_location(status: StatusCode, headers: &HeaderMap) -> Result<String, ProbeError> {
    let status = status.as_u16();
    let value = headers
        .get(LOCATION)
        .filter(|value| !value.is_empty())
        .ok_or(ProbeError::MissingLocation { status })?;

    value
        .to_str()
        .map(str::to_owned)
        .map_err(|e| ProbeError::InvalidLocation {
            location: String::from_utf8_lossy(value.as_bytes()).into_owned(),
            message: e.to_string(),
        })
}

/// Configuration for HTTP fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Timeout applied to each request in a redirect chain (default: 10s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Maximum number of redirects followed (default: 10).
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// User-Agent header override.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: None,
        }
    }
}

impl FetchConfig {
    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the redirect bound.
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Result of fetching one host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchOutcome {
    pub url: String,
    /// Status of the final response after redirects.
    pub status_code: u16,
    pub body_length_bytes: u64,
    pub body_size_mb: f64,
    /// `Location` values followed, in order.
    pub redirects: Vec<String>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<ProbeError>,
}

impl FetchOutcome {
    /// Successful outcome for a final response and its body length.
    pub fn fetched(
        url: impl Into<String>,
        status_code: u16,
        body_length_bytes: u64,
        redirects: Vec<String>,
    ) -> Self {
        Self {
            url: url.into(),
            status_code,
            body_length_bytes,
            body_size_mb: body_length_bytes as f64 / BYTES_PER_MB,
            redirects,
            error: None,
        }
    }

    /// Errored outcome keeping the redirects followed before the failure.
    pub fn errored(url: impl Into<String>, redirects: Vec<String>, error: ProbeError) -> Self {
        Self {
            url: url.into(),
            status_code: 0,
            body_length_bytes: 0,
            body_size_mb: 0.0,
            redirects,
            error: Some(error),
        }
    }

    /// Whether at least one redirect was followed.
    pub fn was_redirected(&self) -> bool {
        !self.redirects.is_empty()
    }
}

impl Outcome for FetchOutcome {
    fn url(&self) -> &str {
        &self.url
    }

    fn error(&self) -> Option<&ProbeError> {
        self.error.as_ref()
    }

    fn failed(url: &str, error: ProbeError) -> Self {
        Self::errored(url, Vec::new(), error)
    }
}

/// Only these statuses are followed; other 3xx responses are final.
fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(status, StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND)
}

/// HTTP content fetcher.
///
/// Holds one connection-pooled client shared by all concurrent fetches.
/// Automatic redirects are disabled on the client.
#[derive(Debug, Clone)]
pub struct Fetcher {
    config: FetchConfig,
    client: Client,
}

impl Fetcher {
    /// Create a new fetcher with the given configuration.
    ///
    /// # Errors
    /// Returns `SetupError::HttpClient` if the HTTP client cannot be built.
    pub fn new(config: FetchConfig) -> Result<Self, SetupError> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .redirect(redirect::Policy::none());

        if let Some(ref user_agent) = config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        } else {
            builder = builder.user_agent(concat!("webdash/", env!("CARGO_PKG_VERSION")));
        }

        let client = builder.build()?;
        Ok(Self { config, client })
    }

    /// Get the fetcher's configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn get(&self, url: &str) -> Result<Response, ProbeError> {
        self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(self.config.timeout)
            } else {
                ProbeError::Request {
                    url: url.to_string(),
                    message: e.without_url().to_string(),
                }
            }
        })
    }

    /// Follow the redirect chain from `url` and read the final body.
    ///
    /// Every `Location` followed is pushed onto `redirects` before the next
    /// hop is requested, so the chain survives a failure part-way through.
    /// Returns the final status and body length.
    async fn follow(
        &self,
        url: &str,
        redirects: &mut Vec<String>,
    ) -> Result<(u16, u64), ProbeError> {
        let mut response = self.get(url).await?;

        while is_followed_redirect(response.status()) {
            let location = redirect_location(response.status(), response.headers())?;

            if redirects.len() >= self.config.max_redirects {
                return Err(ProbeError::TooManyRedirects(self.config.max_redirects));
            }

            // Relative locations resolve against the URL that answered
            let next = response
                .url()
                .join(&location)
                .map_err(|e| ProbeError::InvalidLocation {
                    location: location.clone(),
                    message: e.to_string(),
                })?;

            tracing::debug!(
                from = %response.url(),
                to = %next,
                status = response.status().as_u16(),
                "Following redirect"
            );
            redirects.push(location);

            // Release the redirect response before the next hop
            drop(response);
            response = self.get(next.as_str()).await?;
        }

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(self.config.timeout)
            } else {
                ProbeError::BodyRead {
                    status,
                    message: e.without_url().to_string(),
                }
            }
        })?;

        Ok((status, body.len() as u64))
    }
}

#[async_trait::async_trait]
impl Probe for Fetcher {
    type Outcome = FetchOutcome;

    fn kind(&self) -> &'static str {
        "fetch"
    }

    async fn probe(&self, url: &str) -> FetchOutcome {
        let mut redirects = Vec::new();

        match self.follow(url, &mut redirects).await {
            Ok((status, body_length)) => {
                tracing::debug!(
                    url = %url,
                    status = status,
                    bytes = body_length,
                    redirects = redirects.len(),
                    "Fetch complete"
                );
                FetchOutcome::fetched(url, status, body_length, redirects)
            }
            Err(e) => {
                tracing::warn!(
                    url = %url,
                    redirects = redirects.len(),
                    error = %e,
                    "Fetch failed"
                );
                FetchOutcome::errored(url, redirects, e)
            }
        }
    }
}
