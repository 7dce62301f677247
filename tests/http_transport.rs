//! HTTP transport and end-to-end client behaviour against a mock server.

use geo_resilient_client::{
    CompletionBackend, ErrorKind, HttpTransport, RecoveryPolicy, RequestPayload,
    ResilientClientBuilder,
};
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;

const SUCCESS_BODY: &str = r#"{
  "candidates": [{
    "content": { "role": "model", "parts": [{ "text": "Acme is frequently cited." }] },
    "finishReason": "STOP",
    "groundingMetadata": {
      "groundingChunks": [{ "web": { "uri": "https://acme.example", "title": "acme.example" } }]
    }
  }],
  "modelVersion": "m2-002"
}"#;

fn path(model: &str) -> String {
    format!("/v1beta/models/{}:generateContent", model)
}

fn fast_policy(models: &[&str]) -> RecoveryPolicy {
    RecoveryPolicy::new(models.iter().copied())
        .with_delays(Duration::from_millis(1), Duration::from_millis(5))
}

#[tokio::test]
async fn transport_posts_payload_with_key_query() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", path("gemini-1.5-flash").as_str())
        .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
        .match_header("content-type", "application/json")
        .match_header("x-request-id", Matcher::Any)
        .match_body(Matcher::PartialJson(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }],
            "tools": [{ "googleSearch": {} }]
        })))
        .with_status(429)
        .with_header("retry-after", "7")
        .with_body(r#"{"error":{"code":429,"message":"Resource has been exhausted"}}"#)
        .expect(1)
        .create_async()
        .await;

    let transport = HttpTransport::new(&server.url(), Duration::from_secs(5)).unwrap();
    let payload = RequestPayload::user_text("hello").with_google_search();
    let reply = transport
        .generate("gemini-1.5-flash", "test-key", &payload)
        .await
        .unwrap();

    assert_eq!(reply.status, 429);
    assert_eq!(reply.retry_after_ms, Some(7_000));
    assert!(reply.body.contains("Resource has been exhausted"));
    mock.assert_async().await;
}

#[tokio::test]
async fn client_falls_back_to_next_model_over_http() {
    let mut server = Server::new_async().await;
    let m1 = server
        .mock("POST", path("m1").as_str())
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error":{"code":404,"message":"models/m1 is not found"}}"#)
        .expect(1)
        .create_async()
        .await;
    let m2 = server
        .mock("POST", path("m2").as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(SUCCESS_BODY)
        .expect(1)
        .create_async()
        .await;

    let client = ResilientClientBuilder::new()
        .policy(fast_policy(&["m1", "m2"]))
        .base_url_override(server.url())
        .build()
        .unwrap();

    let resp = client
        .call("test-key", &RequestPayload::user_text("Is Acme cited?"))
        .await
        .unwrap();

    assert_eq!(resp.used_model, "m2");
    assert_eq!(resp.text().as_deref(), Some("Acme is frequently cited."));
    assert_eq!(resp.grounding_sources().len(), 1);
    assert_eq!(resp.body.model_version.as_deref(), Some("m2-002"));
    m1.assert_async().await;
    m2.assert_async().await;
}

#[tokio::test]
async fn invalid_key_over_http_stops_the_walk() {
    let mut server = Server::new_async().await;
    let m1 = server
        .mock("POST", path("m1").as_str())
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(
            r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#,
        )
        .expect(1)
        .create_async()
        .await;
    let m2 = server
        .mock("POST", path("m2").as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(SUCCESS_BODY)
        .expect(0)
        .create_async()
        .await;

    let client = ResilientClientBuilder::new()
        .policy(fast_policy(&["m1", "m2"]))
        .base_url_override(server.url())
        .build()
        .unwrap();

    let err = client
        .call("wrong", &RequestPayload::user_text("hi").with_google_search())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::InvalidCredential);
    assert_eq!(err.backend_calls, 1);
    m1.assert_async().await;
    m2.assert_async().await;
}

#[tokio::test]
async fn non_json_success_body_moves_on() {
    let mut server = Server::new_async().await;
    let _m1 = server
        .mock("POST", path("m1").as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>captive portal</html>")
        .create_async()
        .await;
    let _m2 = server
        .mock("POST", path("m2").as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(SUCCESS_BODY)
        .create_async()
        .await;

    let client = ResilientClientBuilder::new()
        .policy(fast_policy(&["m1", "m2"]))
        .base_url_override(server.url())
        .build()
        .unwrap();

    let (resp, stats) = client
        .call_with_stats("k", &RequestPayload::user_text("hi"))
        .await
        .unwrap();

    assert_eq!(resp.used_model, "m2");
    assert_eq!(stats.attempts[0].outcome, "transport");
}

#[tokio::test]
async fn unreachable_backend_is_transient_failure() {
    // nothing listens on the discard port
    let client = ResilientClientBuilder::new()
        .policy(fast_policy(&["m1", "m2"]))
        .base_url_override("http://127.0.0.1:9")
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let err = client
        .call("secret-key-123", &RequestPayload::user_text("hi"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::TransientBackendFailure);
    assert!(!err.message.contains("secret-key-123"));
    assert_eq!(err.backend_calls, 2);
    assert_eq!(err.last_status, None);
}
