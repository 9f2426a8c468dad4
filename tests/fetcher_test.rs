//! Integration tests for StatusFetcher using wiremock
//!
//! These tests validate the HTTP fetcher's behavior with mock servers.

use esostatus::fetcher::{StatusFetcher, StatusSource};
use esostatus::utils::error::FetchError;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher_for(server: &MockServer, route: &str, timeout: Duration) -> StatusFetcher {
    let url = format!("{}{route}", server.uri());
    StatusFetcher::with_config(&url, "esostatus-test/1.0", timeout).unwrap()
}

/// Test successful fetch from mock server
#[tokio::test]
async fn test_fetch_success() {
    let mock_server = MockServer::start().await;
    let html = r#"<table><tr><td>PC EU Megaserver</td><td>Online</td></tr></table>"#;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = fetcher_for(&mock_server, "/status", Duration::from_secs(5));
    let result = fetcher.fetch().await;

    assert!(result.is_ok(), "Fetch should succeed: {:?}", result.err());
    assert!(result.unwrap().contains("PC EU Megaserver"));
}

/// Test that the configured user agent is sent
#[tokio::test]
async fn test_user_agent_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "esostatus-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = fetcher_for(&mock_server, "/", Duration::from_secs(5));
    assert_eq!(fetcher.fetch().await.unwrap(), "ok");
}

/// Test that server errors are reported without retrying
#[tokio::test]
async fn test_server_error_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = fetcher_for(&mock_server, "/status", Duration::from_secs(5));
    let err = fetcher.fetch().await.unwrap_err();

    assert!(matches!(err, FetchError::ServerError(503)));
    assert!(err.is_transient());
}

/// Test 404 is a permanent failure
#[tokio::test]
async fn test_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let fetcher = fetcher_for(&mock_server, "/missing", Duration::from_secs(5));
    let err = fetcher.fetch().await.unwrap_err();

    assert!(matches!(err, FetchError::ServerError(404)));
    assert!(!err.is_transient());
}

/// Test that a slow server hits the request timeout
#[tokio::test]
async fn test_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let fetcher = fetcher_for(&mock_server, "/slow", Duration::from_millis(300));
    let err = fetcher.fetch().await.unwrap_err();

    assert!(matches!(err, FetchError::Timeout), "got {err:?}");
}

/// Test that the declared charset is honoured
#[tokio::test]
async fn test_latin1_body() {
    let mock_server = MockServer::start().await;
    // "Café Online" in ISO-8859-1
    let body = b"Caf\xe9 Online".to_vec();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=iso-8859-1"),
        )
        .mount(&mock_server)
        .await;

    let fetcher = fetcher_for(&mock_server, "/", Duration::from_secs(5));
    assert_eq!(fetcher.fetch().await.unwrap(), "Café Online");
}

/// Test that an unreachable host surfaces as an HTTP error
#[tokio::test]
async fn test_connection_refused() {
    let mock_server = MockServer::start().await;
    let url = mock_server.uri();
    drop(mock_server);

    let fetcher =
        StatusFetcher::with_config(&url, "esostatus-test/1.0", Duration::from_secs(2)).unwrap();
    let err = fetcher.fetch().await.unwrap_err();

    assert!(matches!(err, FetchError::Http(_) | FetchError::Timeout), "got {err:?}");
    assert!(err.is_transient());
}
