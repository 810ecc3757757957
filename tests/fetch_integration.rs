//! Fetcher Integration Tests
//!
//! Runs the HTTP fetcher against a local axum server that serves redirect
//! chains, large bodies and slow responses.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::net::TcpListener;
use webdash::probe::collect_all;
use webdash::probe::http::{FetchConfig, Fetcher};
use webdash::{Probe, ProbeError};

// =============================================================================
// Test Helpers
// =============================================================================

const MIB: usize = 1024 * 1024;

fn mock_router(addr: SocketAddr) -> Router {
    Router::new()
        .route(
            "/start",
            get(|| async {
                (
                    StatusCode::FOUND,
                    [(header::LOCATION, "/hop")],
                    "found, go to hop",
                )
            }),
        )
        .route(
            "/hop",
            get(|| async {
                (
                    StatusCode::MOVED_PERMANENTLY,
                    [(header::LOCATION, "/final")],
                    "moved, go to final",
                )
            }),
        )
        .route("/final", get(|| async { vec![b'x'; 2048] }))
        .route(
            "/absolute",
            get(move || async move {
                (
                    StatusCode::FOUND,
                    [(header::LOCATION, format!("http://{addr}/final"))],
                )
            }),
        )
        .route("/mebibyte", get(|| async { vec![b'a'; MIB] }))
        .route(
            "/loop",
            get(|| async { (StatusCode::FOUND, [(header::LOCATION, "/loop")]) }),
        )
        .route(
            "/dead-end",
            get(|| async {
                (
                    StatusCode::MOVED_PERMANENTLY,
                    [(header::LOCATION, "http://127.0.0.1:1/")],
                )
            }),
        )
        .route("/no-location", get(|| async { StatusCode::FOUND }))
        .route(
            "/see-other",
            get(|| async { (StatusCode::SEE_OTHER, [(header::LOCATION, "/final")]) }),
        )
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, "not here").into_response() }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                "slow"
            }),
        )
        .route(
            "/stall",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "never"
            }),
        )
}

/// Start mock server and return base URL.
async fn start_mock_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, mock_router(addr)).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Start a server that sends headers and part of the body, then stalls.
fn start_stalling_body_server() -> String {
    use std::io::{Read, Write};

    let listener =
        std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request);
            let _ = stream.write_all(
                b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\nContent-Type: text/plain\r\n\r\npartial",
            );
            let _ = stream.flush();
            std::thread::sleep(Duration::from_secs(3));
        }
    });

    format!("http://{}", addr)
}

fn fetcher(config: FetchConfig) -> Fetcher {
    Fetcher::new(config).expect("Failed to build fetcher")
}

// =============================================================================
// Redirect Tests
// =============================================================================

#[tokio::test]
async fn test_follows_302_then_301_to_final() {
    let base = start_mock_server().await;
    let url = format!("{base}/start");

    let outcome = fetcher(FetchConfig::default()).probe(&url).await;

    assert_eq!(outcome.error, None);
    assert_eq!(outcome.url, url);
    assert_eq!(outcome.redirects, vec!["/hop", "/final"]);
    assert_eq!(outcome.status_code, 200);
    // Only the final body is measured
    assert_eq!(outcome.body_length_bytes, 2048);
    assert!((outcome.body_size_mb - 2048.0 / MIB as f64).abs() < 1e-12);
}

#[tokio::test]
async fn test_absolute_location_recorded_verbatim() {
    let base = start_mock_server().await;

    let outcome = fetcher(FetchConfig::default())
        .probe(&format!("{base}/absolute"))
        .await;

    assert_eq!(outcome.error, None);
    assert_eq!(outcome.redirects, vec![format!("{base}/final")]);
    assert_eq!(outcome.status_code, 200);
}

#[tokio::test]
async fn test_cyclic_redirect_is_bounded() {
    let base = start_mock_server().await;
    let config = FetchConfig::default().with_max_redirects(3);

    let outcome = fetcher(config).probe(&format!("{base}/loop")).await;

    assert_eq!(outcome.error, Some(ProbeError::TooManyRedirects(3)));
    assert_eq!(outcome.redirects, vec!["/loop", "/loop", "/loop"]);
    assert_eq!(outcome.status_code, 0);
    assert_eq!(outcome.body_length_bytes, 0);
}

#[tokio::test]
async fn test_failure_mid_chain_keeps_redirects() {
    let base = start_mock_server().await;

    let outcome = fetcher(FetchConfig::default())
        .probe(&format!("{base}/dead-end"))
        .await;

    assert!(matches!(outcome.error, Some(ProbeError::Request { .. })));
    assert_eq!(outcome.redirects, vec!["http://127.0.0.1:1/"]);
    assert_eq!(outcome.status_code, 0);
    assert_eq!(outcome.body_size_mb, 0.0);
}

#[tokio::test]
async fn test_redirect_without_location() {
    let base = start_mock_server().await;

    let outcome = fetcher(FetchConfig::default())
        .probe(&format!("{base}/no-location"))
        .await;

    assert_eq!(outcome.error, Some(ProbeError::MissingLocation { status: 302 }));
    assert!(outcome.redirects.is_empty());
}

#[tokio::test]
async fn test_other_redirect_statuses_are_final() {
    let base = start_mock_server().await;

    let outcome = fetcher(FetchConfig::default())
        .probe(&format!("{base}/see-other"))
        .await;

    assert_eq!(outcome.error, None);
    assert_eq!(outcome.status_code, 303);
    assert!(outcome.redirects.is_empty());
}

// =============================================================================
// Body and Status Tests
// =============================================================================

#[tokio::test]
async fn test_one_mebibyte_body_is_one_mb() {
    let base = start_mock_server().await;

    let outcome = fetcher(FetchConfig::default())
        .probe(&format!("{base}/mebibyte"))
        .await;

    assert_eq!(outcome.error, None);
    assert_eq!(outcome.body_length_bytes, MIB as u64);
    assert!((outcome.body_size_mb - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_error_status_is_not_a_probe_error() {
    let base = start_mock_server().await;

    let outcome = fetcher(FetchConfig::default())
        .probe(&format!("{base}/missing"))
        .await;

    assert_eq!(outcome.error, None);
    assert_eq!(outcome.status_code, 404);
    assert_eq!(outcome.body_length_bytes, "not here".len() as u64);
}

#[tokio::test]
async fn test_connection_refused() {
    let outcome = fetcher(FetchConfig::default())
        .probe("http://127.0.0.1:1/")
        .await;

    assert!(matches!(outcome.error, Some(ProbeError::Request { .. })));
    assert!(outcome.redirects.is_empty());
}

// =============================================================================
// Timeout and Concurrency Tests
// =============================================================================

#[tokio::test]
async fn test_request_timeout() {
    let base = start_mock_server().await;
    let config = FetchConfig::default().with_timeout(Duration::from_millis(100));

    let outcome = fetcher(config).probe(&format!("{base}/slow")).await;

    assert_eq!(
        outcome.error,
        Some(ProbeError::Timeout(Duration::from_millis(100)))
    );
    assert_eq!(outcome.status_code, 0);
}

#[tokio::test]
async fn test_body_read_timeout_is_timeout() {
    let base = start_stalling_body_server();
    let config = FetchConfig::default().with_timeout(Duration::from_millis(300));

    let outcome = fetcher(config).probe(&format!("{base}/")).await;

    assert_eq!(
        outcome.error,
        Some(ProbeError::Timeout(Duration::from_millis(300)))
    );
    assert_eq!(outcome.status_code, 0);
    assert_eq!(outcome.body_length_bytes, 0);
}

#[tokio::test]
async fn test_fan_in_isolates_failures() {
    let base = start_mock_server().await;
    let urls = vec![
        format!("{base}/start"),
        "http://127.0.0.1:1/".to_string(),
        format!("{base}/mebibyte"),
    ];

    let fetcher = Arc::new(fetcher(FetchConfig::default()));
    let outcomes = collect_all(fetcher, &urls, Duration::from_secs(10)).await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].status_code, 200);
    assert!(outcomes[1].error.is_some());
    assert_eq!(outcomes[2].body_length_bytes, MIB as u64);
}

#[tokio::test]
async fn test_fetches_run_concurrently() {
    let base = start_mock_server().await;
    let urls: Vec<String> = (0..5).map(|_| format!("{base}/slow")).collect();

    let fetcher = Arc::new(fetcher(FetchConfig::default()));
    let start = Instant::now();
    let outcomes = collect_all(fetcher, &urls, Duration::from_secs(10)).await;
    let elapsed = start.elapsed();

    assert_eq!(outcomes.len(), 5);
    assert!(outcomes.iter().all(|o| o.error.is_none()));
    // Five sequential 300ms responses would take 1.5s
    assert!(elapsed < Duration::from_millis(1200), "took {elapsed:?}");
}

#[tokio::test]
async fn test_stalled_host_does_not_block_batch() {
    let base = start_mock_server().await;
    let urls = vec![format!("{base}/final"), format!("{base}/stall")];

    let fetcher = Arc::new(fetcher(FetchConfig::default()));
    let start = Instant::now();
    let outcomes = collect_all(fetcher, &urls, Duration::from_millis(500)).await;

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].status_code, 200);
    assert_eq!(
        outcomes[1].error,
        Some(ProbeError::Timeout(Duration::from_millis(500)))
    );
}
