//! Retry, rate limit and cancellation behaviour of the request pipeline.
//!
//! Uses wiremock to script failing responses and counts how many attempts
//! reach the server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::StatusCode;
use tfeapi::{CancellationToken, Config, RetryEvent, RetryLogHook, TfeClient, TfeError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn org_body() -> serde_json::Value {
    serde_json::json!({
        "data": {
            "id": "acme",
            "type": "organizations",
            "attributes": { "name": "acme", "email": "admin@acme.test" }
        }
    })
}

fn fast_config(server: &MockServer) -> Config {
    Config {
        address: server.uri(),
        token: "test-token".to_string(),
        retry_wait_min: Duration::from_millis(1),
        retry_wait_max: Duration::from_millis(2),
        retry_max: 3,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_server_error_not_retried_by_default() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/organizations/acme"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = TfeClient::new(fast_config(&mock_server)).unwrap();
    let result = client.organizations().read("acme").await;

    match result {
        Err(TfeError::Api { status, .. }) => assert_eq!(status, 503),
        other => panic!("Expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_retried_until_ceiling() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/organizations/acme"))
        .respond_with(ResponseTemplate::new(502))
        .expect(4)
        .mount(&mock_server)
        .await;

    let config = Config {
        retry_server_errors: true,
        ..fast_config(&mock_server)
    };
    let client = TfeClient::new(config).unwrap();
    let result = client.organizations().read("acme").await;

    assert!(matches!(result, Err(TfeError::Api { status: 502, .. })));
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/organizations/acme"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/organizations/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(org_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = TfeClient::new(fast_config(&mock_server)).unwrap();
    let org = client.organizations().read("acme").await.unwrap();

    assert_eq!(org.attributes.name, "acme");
}

#[tokio::test]
async fn test_retry_hook_sees_every_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/organizations/acme"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/organizations/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(org_body()))
        .mount(&mock_server)
        .await;

    let events: Arc<Mutex<Vec<RetryEvent>>> = Arc::default();
    let sink = Arc::clone(&events);
    let config = Config {
        retry_log_hook: Some(RetryLogHook::new(move |event| {
            sink.lock().unwrap().push(event.clone());
        })),
        ..fast_config(&mock_server)
    };

    let client = TfeClient::new(config).unwrap();
    client.organizations().read("acme").await.unwrap();

    let events = events.lock().unwrap();
    let attempts: Vec<u32> = events.iter().map(|e| e.attempt).collect();
    assert_eq!(attempts, vec![1, 2]);
    assert!(events
        .iter()
        .all(|e| e.status == Some(StatusCode::TOO_MANY_REQUESTS)));
}

#[tokio::test]
async fn test_cancelled_token_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(org_body()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let token = CancellationToken::new();
    token.cancel();

    let client = TfeClient::new(fast_config(&mock_server))
        .unwrap()
        .with_cancellation(token);
    let result = client.organizations().read("acme").await;

    assert!(matches!(result, Err(TfeError::Cancelled)));
}

#[tokio::test]
async fn test_cancel_interrupts_backoff() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/organizations/acme"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let token = CancellationToken::new();
    let config = Config {
        retry_wait_min: Duration::from_secs(30),
        retry_wait_max: Duration::from_secs(30),
        ..fast_config(&mock_server)
    };
    let client = TfeClient::new(config)
        .unwrap()
        .with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        client.organizations().read("acme"),
    )
    .await
    .expect("cancellation should end the backoff wait");

    assert!(matches!(result, Err(TfeError::Cancelled)));
    canceller.await.unwrap();
}

#[tokio::test]
async fn test_connect_configures_limiter_and_version() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/ping"))
        .respond_with(
            ResponseTemplate::new(204)
                .insert_header("X-RateLimit-Limit", "30")
                .insert_header("TFP-API-Version", "2.6"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = TfeClient::connect(fast_config(&mock_server)).await.unwrap();

    assert_eq!(client.remote_api_version().as_deref(), Some("2.6"));
    assert_eq!(client.rate_limiter().settings(), Some((20.0, 10.0)));
}

#[tokio::test]
async fn test_connect_without_limit_leaves_limiter_open() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/ping"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = TfeClient::connect(fast_config(&mock_server)).await.unwrap();

    assert_eq!(client.remote_api_version(), None);
    assert_eq!(client.rate_limiter().settings(), None);
}

#[tokio::test]
async fn test_connect_rejects_bad_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/ping"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let result = TfeClient::connect(fast_config(&mock_server)).await;

    assert!(matches!(result, Err(TfeError::Unauthorized)));
}

#[tokio::test]
async fn test_cancel_interrupts_rate_limit_wait() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/ping"))
        .respond_with(ResponseTemplate::new(204).insert_header("X-RateLimit-Limit", "1"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/organizations/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(org_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = TfeClient::connect(fast_config(&mock_server)).await.unwrap();
    // Burst of one: this read drains the bucket for the next 1.5s.
    client.organizations().read("acme").await.unwrap();

    let token = CancellationToken::new();
    let bound = client.with_cancellation(token.clone());
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(1), bound.organizations().read("acme"))
        .await
        .expect("cancellation should end the rate limit wait");

    assert!(matches!(result, Err(TfeError::Cancelled)));
    canceller.await.unwrap();
}

fn unreachable_config(retry_server_errors: bool, calls: Arc<Mutex<u32>>) -> Config {
    Config {
        // Nothing listens on port 1.
        address: "http://127.0.0.1:1".to_string(),
        token: "test-token".to_string(),
        retry_wait_min: Duration::from_millis(1),
        retry_wait_max: Duration::from_millis(2),
        retry_max: 3,
        retry_server_errors,
        retry_log_hook: Some(RetryLogHook::new(move |event| {
            assert_eq!(event.status, None);
            *calls.lock().unwrap() += 1;
        })),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_transport_error_not_retried_by_default() {
    let calls: Arc<Mutex<u32>> = Arc::default();
    let client = TfeClient::new(unreachable_config(false, Arc::clone(&calls))).unwrap();

    let result = client.organizations().read("acme").await;

    assert!(matches!(result, Err(TfeError::HttpError(_))));
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_transport_error_retried_until_ceiling() {
    let calls: Arc<Mutex<u32>> = Arc::default();
    let client = TfeClient::new(unreachable_config(true, Arc::clone(&calls))).unwrap();

    let result = client.organizations().read("acme").await;

    assert!(matches!(result, Err(TfeError::HttpError(_))));
    assert_eq!(*calls.lock().unwrap(), 3);
}
