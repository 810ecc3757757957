//! HTTP probes for measuring content retrieval.
//!
//! - [`Fetcher`]: GET with manual 301/302 following, reported as a [`FetchOutcome`]

mod fetcher;

pub use fetcher::{BYTES_PER_MB, FetchConfig, FetchOutcome, Fetcher};
