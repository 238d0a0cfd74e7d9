//! Integration tests for the shared HTTP transport.

mod common;

use std::time::Duration;

use reviewbot::llm::TextGenerator;
use reviewbot::llm::openai::OpenAiClient;
use reviewbot::transport::{TransportConfig, build_transport};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::client_config;

fn ok_completion() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"content": "ok"}}],
        "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
    }))
}

#[tokio::test]
async fn test_configured_headers_reach_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-team", "platform"))
        .and(header("x-trace", "a=b"))
        .respond_with(ok_completion())
        .expect(1)
        .mount(&server)
        .await;

    let http = build_transport(&TransportConfig {
        headers: vec![
            "X-Team=platform".into(),
            "X-Trace=a=b".into(),
            "malformed-entry".into(),
        ],
        ..TransportConfig::default()
    })
    .unwrap();

    let client = OpenAiClient::new(client_config(&server.uri()), http);
    let response = client
        .chat_completion(&CancellationToken::new(), "hi")
        .await
        .unwrap();
    assert_eq!(response.text, "ok");
}

#[tokio::test]
async fn test_timeout_applies_to_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_completion().set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let http = build_transport(&TransportConfig {
        timeout: Duration::from_millis(200),
        ..TransportConfig::default()
    })
    .unwrap();

    let client = OpenAiClient::new(client_config(&server.uri()), http);
    let err = client
        .chat_completion(&CancellationToken::new(), "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, reviewbot::ProviderError::Http { .. }));
}
