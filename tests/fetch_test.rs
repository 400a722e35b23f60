//! Integration tests for authenticated fetching and rate-limit backoff.

use std::sync::Arc;
use std::time::Duration;

use weibo_timeline::fetch::{BackoffPolicy, FetchError, Fetcher, RecordingSleeper};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(policy: BackoffPolicy, sleeper: &Arc<RecordingSleeper>) -> Fetcher {
    Fetcher::new("SUB=abc; SUBP=def", policy, Duration::from_secs(5))
        .expect("Failed to build fetcher")
        .with_sleeper(sleeper.clone())
}

#[tokio::test]
async fn test_throttled_fetch_backs_off_linearly_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1669879400/profile"))
        .respond_with(ResponseTemplate::new(418))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1669879400/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><title>ok</title></html>"))
        .mount(&server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let fetcher = fetcher(BackoffPolicy::default(), &sleeper);

    let response = fetcher
        .fetch(&format!("{}/1669879400/profile?page=1", server.uri()))
        .await
        .expect("Fetch should eventually succeed");

    assert!(response.is_success());
    assert_eq!(response.body, b"<html><title>ok</title></html>");
    assert_eq!(
        sleeper.slept(),
        vec![
            Duration::from_secs(10),
            Duration::from_secs(20),
            Duration::from_secs(30)
        ]
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_backoff_restarts_for_each_call() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(418))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(418))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let fetcher = fetcher(BackoffPolicy::default(), &sleeper);
    fetcher.fetch(&format!("{}/a", server.uri())).await.unwrap();
    fetcher.fetch(&format!("{}/b", server.uri())).await.unwrap();

    assert_eq!(
        sleeper.slept(),
        vec![Duration::from_secs(10), Duration::from_secs(10)]
    );
}

#[tokio::test]
async fn test_retry_cap_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(418))
        .mount(&server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let policy = BackoffPolicy {
        step: Duration::from_secs(1),
        max_retries: Some(2),
    };
    let err = fetcher(policy, &sleeper)
        .fetch(&format!("{}/x", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::RateLimited { throttles: 3, .. }));
    assert_eq!(
        sleeper.slept(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_other_statuses_are_returned_as_is() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
        .mount(&server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let response = fetcher(BackoffPolicy::default(), &sleeper)
        .fetch(&format!("{}/missing", server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 404);
    assert!(sleeper.slept().is_empty());
    assert!(matches!(
        response.error_for_status(),
        Err(FetchError::Status { .. })
    ));
}

#[tokio::test]
async fn test_cookie_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("cookie", "SUB=abc; SUBP=def"))
        .respond_with(ResponseTemplate::new(200).set_body_string("with cookie"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let response = fetcher(BackoffPolicy::default(), &sleeper)
        .fetch(&server.uri())
        .await
        .unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn test_json_fetch() {
    #[derive(Debug, serde::Deserialize)]
    struct Payload {
        ok: i32,
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":1}"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let fetcher = fetcher(BackoffPolicy::default(), &sleeper);

    let payload: Payload = fetcher
        .fetch_json(&format!("{}/api", server.uri()))
        .await
        .unwrap();
    assert_eq!(payload.ok, 1);

    let err = fetcher
        .fetch_json::<Payload>(&format!("{}/broken", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Json { .. }));
}
