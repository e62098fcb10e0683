mod common;

use common::mock_server::{MockResponse, MockServer};
use common::{free_port, publish_config};
use namecast::channel::Channel;
use namecast::config::SecureString;
use namecast::publish::{PublishClient, PublishError, TransportReason};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_publish_sends_envelope_and_returns_ack() {
    let server = MockServer::start().await;
    server
        .enqueue_response(MockResponse::json(r#"{"ok": true, "id": "abc"}"#))
        .await;

    let client = PublishClient::new(publish_config(&server.publish_url())).unwrap();
    let ack = client.publish("user", &json!({"user": "Jane"})).await.unwrap();

    assert_eq!(ack.status, 200);
    assert_eq!(ack.body, Some(json!({"ok": true, "id": "abc"})));

    let requests = server.captured_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/publish");
    assert_eq!(requests[0].header("content-type"), Some("application/json"));
    assert_eq!(
        requests[0].body_text(),
        r#"{"event":"user","data":{"user":"Jane"}}"#
    );
}

#[tokio::test]
async fn test_server_error_is_rejected_and_leaves_state_alone() {
    let server = MockServer::start().await;
    server
        .enqueue_response(MockResponse::error(500, "boom"))
        .await;
    let (channel, _feed) = Channel::manual("reset");

    let client = PublishClient::new(publish_config(&server.publish_url())).unwrap();
    let err = client
        .publish("user", &json!({"user": "Jane"}))
        .await
        .unwrap_err();

    match &err {
        PublishError::Rejected { status, body } => {
            assert_eq!(*status, 500);
            assert!(body.contains("boom"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert_eq!(err.status(), Some(500));
    assert_eq!(channel.latest("user"), None);
    assert_eq!(channel.sequence("user"), 0);
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let server = MockServer::start().await;
    server
        .enqueue_response(MockResponse::default().with_delay(1_000))
        .await;

    let client = PublishClient::new(publish_config(&server.publish_url())).unwrap();
    let err = client
        .publish_with_timeout("user", &json!({"user": "Jane"}), Duration::from_millis(100))
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "expected timeout, got {err:?}");
    assert!(matches!(
        err,
        PublishError::Transport {
            reason: TransportReason::Timeout,
            ..
        }
    ));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let url = format!("http://127.0.0.1:{}/publish", free_port());
    let client = PublishClient::new(publish_config(&url)).unwrap();
    let err = client.publish("user", &json!({"user": "Jane"})).await.unwrap_err();
    assert!(matches!(
        err,
        PublishError::Transport {
            reason: TransportReason::Connect,
            ..
        }
    ));
}

#[tokio::test]
async fn test_credential_and_origin_headers() {
    let server = MockServer::start().await;
    let mut config = publish_config(&server.publish_url());
    config.credential = Some(SecureString::new("secret-token".to_string()));
    config.origin = Some("http://app.local".to_string());

    let client = PublishClient::new(config).unwrap();
    client.publish("user", &json!({"user": "Jane"})).await.unwrap();

    let requests = server.captured_requests().await;
    assert_eq!(requests[0].header("authorization"), Some("Bearer secret-token"));
    assert_eq!(requests[0].header("origin"), Some("http://app.local"));
}

#[tokio::test]
async fn test_non_json_ack_kept_as_text() {
    let server = MockServer::start().await;
    server.enqueue_response(MockResponse::json("accepted")).await;

    let client = PublishClient::new(publish_config(&server.publish_url())).unwrap();
    let ack = client.publish("user", &json!({"user": "Jane"})).await.unwrap();
    assert_eq!(ack.body, Some(json!("accepted")));
}

#[tokio::test]
async fn test_redirect_is_not_followed() {
    let server = MockServer::start().await;
    server
        .enqueue_response(MockResponse::redirect(307, &server.publish_url()))
        .await;

    let client = PublishClient::new(publish_config(&server.publish_url())).unwrap();
    let err = client
        .publish("user", &json!({"user": "Jane"}))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(307));
    assert_eq!(server.captured_requests().await.len(), 1);
}
