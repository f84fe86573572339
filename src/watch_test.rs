use std::time::Duration;
use std::time::Instant;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;
use wiremock::matchers::body_string;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

use crate::Client;
use crate::ClientError;
use crate::Response;

fn client_for(server: &MockServer) -> Client {
    Client::builder(vec![server.uri()]).build().unwrap()
}

/// Mounts one replay response: a POST for `expected_body` answered with a
/// change record at `index`.
async fn mount_change(
    server: &MockServer,
    expected_body: &str,
    index: u64,
) {
    Mock::given(method("POST"))
        .and(path("/v1/watch/queue"))
        .and(body_string(expected_body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "action": "set",
            "key": format!("/queue/{index}"),
            "value": "job",
            "index": index
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
#[traced_test]
async fn test_watch_waits_with_get_when_index_is_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/watch/queue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "action": "set",
            "key": "/queue/1",
            "value": "job",
            "index": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let change = client.watch().watch_once("queue", 0, None).await.unwrap();

    assert_eq!(change.key, "/queue/1");
    assert_eq!(change.index, 3);
}

#[tokio::test]
#[traced_test]
async fn test_watch_replays_with_post_when_index_given() {
    let server = MockServer::start().await;
    mount_change(&server, "index=7", 7).await;

    let client = client_for(&server);
    let change = client.watch().watch_once("queue", 7, None).await.unwrap();

    assert_eq!(change.index, 7);
}

#[tokio::test]
#[traced_test]
async fn test_watch_error_status_is_structured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/watch/queue"))
        .and(body_string("index=7"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errorCode": 401,
            "message": "The event in requested index is outdated and cleared",
            "cause": "the requested history has been cleared [1000/7]"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.watch().watch_once("queue", 7, None).await.unwrap_err();

    match err {
        ClientError::Server(api) => assert_eq!(api.error_code, 401),
        other => panic!("expected Server, got {other:?}"),
    }
}

#[tokio::test]
#[traced_test]
async fn test_watch_payload_must_be_a_single_record() {
    // Reads tolerate both shapes; the watch path does not.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/watch/queue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"action": "set", "key": "/queue/1", "value": "job", "index": 3}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.watch().watch_once("queue", 0, None).await.unwrap_err();

    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
#[traced_test]
async fn test_watch_rejects_an_empty_array_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/watch/queue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.watch().watch_once("queue", 0, None).await.unwrap_err();

    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
#[traced_test]
async fn test_stop_cancels_an_in_flight_watch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/watch/queue"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "action": "set",
                    "key": "/queue/1",
                    "value": "job",
                    "index": 1
                }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let stop = CancellationToken::new();
    let canceller = stop.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let err = client.watch().watch_once("queue", 0, Some(stop)).await.unwrap_err();

    assert!(matches!(err, ClientError::WatchStopped));
    // Cancellation must not wait out the long poll.
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
#[traced_test]
async fn test_late_response_after_stop_is_released() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/watch/queue"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "action": "set",
                    "key": "/queue/1",
                    "value": "job",
                    "index": 1
                }))
                .set_delay(Duration::from_millis(800)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let stop = CancellationToken::new();
    let canceller = stop.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let err = client.watch().watch_once("queue", 0, Some(stop)).await.unwrap_err();
    assert!(matches!(err, ClientError::WatchStopped));

    // Let the abandoned request complete and drop its response.
    sleep(Duration::from_millis(1200)).await;

    // The client stays usable afterwards.
    let change = client.watch().watch_once("queue", 0, None).await.unwrap();
    assert_eq!(change.index, 1);
}

#[tokio::test]
#[traced_test]
async fn test_stop_after_arrival_changes_nothing() {
    let server = MockServer::start().await;
    mount_change(&server, "index=5", 5).await;

    let client = client_for(&server);
    let stop = CancellationToken::new();
    let change = client.watch().watch_once("queue", 5, Some(stop.clone())).await.unwrap();

    stop.cancel();

    assert_eq!(change.index, 5);
}

#[tokio::test]
#[traced_test]
async fn test_watch_without_sink_returns_single_response() {
    let server = MockServer::start().await;
    mount_change(&server, "index=7", 7).await;

    let client = client_for(&server);
    let result = client.watch().watch("queue", 7, None, None).await.unwrap();

    assert_eq!(result.map(|r| r.index), Some(7));
}

#[tokio::test]
#[traced_test]
async fn test_watch_streams_in_index_order() {
    let server = MockServer::start().await;
    // The server history has gaps; the loop still resumes from one past
    // whatever it last saw.
    mount_change(&server, "index=4", 5).await;
    mount_change(&server, "index=6", 9).await;
    mount_change(&server, "index=10", 10).await;
    Mock::given(method("POST"))
        .and(path("/v1/watch/queue"))
        .and(body_string("index=11"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errorCode": 401,
            "message": "The event in requested index is outdated and cleared"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::channel::<Response>(8);
    let collector = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(change) = rx.recv().await {
            seen.push(change.index);
        }
        seen
    });

    let client = client_for(&server);
    let err = client.watch().watch("queue", 4, Some(tx), None).await.unwrap_err();
    assert!(matches!(err, ClientError::Server(_)));

    let seen = collector.await.unwrap();
    assert_eq!(seen, vec![5, 9, 10]);
}

#[tokio::test]
#[traced_test]
async fn test_slow_consumer_backpressures_the_loop() {
    let server = MockServer::start().await;
    mount_change(&server, "index=1", 1).await;
    mount_change(&server, "index=2", 2).await;
    Mock::given(method("POST"))
        .and(path("/v1/watch/queue"))
        .and(body_string("index=3"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errorCode": 100,
            "message": "Key Not Found",
            "cause": "/queue"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (tx, mut rx) = mpsc::channel(1);
    let watcher = client.watch().clone();
    let engine = tokio::spawn(async move { watcher.watch("queue", 1, Some(tx), None).await });

    // The first change fills the only slot; the second blocks the loop
    // before it can ask for index=3.
    sleep(Duration::from_millis(300)).await;
    assert!(!engine.is_finished());
    let third_requested = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.body == b"index=3")
        .count();
    assert_eq!(third_requested, 0);

    assert_eq!(rx.recv().await.unwrap().index, 1);
    assert_eq!(rx.recv().await.unwrap().index, 2);

    let result = engine.await.unwrap();
    assert!(matches!(result, Err(ClientError::Server(_))));
}

#[tokio::test]
#[traced_test]
async fn test_consumer_hangup_ends_the_stream() {
    let server = MockServer::start().await;
    mount_change(&server, "index=1", 1).await;

    let client = client_for(&server);
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    let result = client.watch().watch("queue", 1, Some(tx), None).await.unwrap();

    assert!(result.is_none());
}

#[tokio::test]
#[traced_test]
async fn test_stop_terminates_a_streaming_watch() {
    let server = MockServer::start().await;
    mount_change(&server, "index=1", 1).await;
    Mock::given(method("POST"))
        .and(path("/v1/watch/queue"))
        .and(body_string("index=2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "action": "set",
                    "key": "/queue/2",
                    "value": "job",
                    "index": 2
                }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (tx, mut rx) = mpsc::channel(4);
    let stop = CancellationToken::new();
    let canceller = stop.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    });

    let err = client.watch().watch("queue", 1, Some(tx), Some(stop)).await.unwrap_err();

    assert!(matches!(err, ClientError::WatchStopped));
    // The change delivered before the stop is still in the channel.
    assert_eq!(rx.recv().await.unwrap().index, 1);
    assert!(rx.recv().await.is_none());
}
