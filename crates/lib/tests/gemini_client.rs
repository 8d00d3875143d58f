//! GeminiClient against a local mock of the generateContent endpoint.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wxgem::config::GeminiConfig;
use wxgem::llm::{GeminiClient, GenerateError, TextGenerator};

fn client_for(server: &MockServer) -> GeminiClient {
    let config = GeminiConfig {
        base_url: server.uri(),
        model: "test-model".to_string(),
        ..GeminiConfig::default()
    };
    GeminiClient::new(&config, "secret-key".to_string()).unwrap()
}

#[tokio::test]
async fn generate_returns_candidate_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .and(query_param("key", "secret-key"))
        .and(body_partial_json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hi! " }, { "text": "How can I help?" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 1, "candidatesTokenCount": 5 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = client_for(&server).generate("hello").await.unwrap();
    assert_eq!(text.as_deref(), Some("Hi! How can I help?"));
}

#[tokio::test]
async fn blocked_prompt_yields_no_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let text = client_for(&server).generate("something").await.unwrap();
    assert_eq!(text, None);
}

#[tokio::test]
async fn api_error_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
        .mount(&server)
        .await;

    let err = client_for(&server).generate("hello").await.unwrap_err();
    match err {
        GenerateError::Api { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "API key not valid");
        }
        other => panic!("expected api error, got {:?}", other),
    }
}

#[tokio::test]
async fn invalid_json_is_a_request_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).generate("hello").await.unwrap_err();
    assert!(matches!(err, GenerateError::Request(_)));
}

#[tokio::test]
async fn zero_timeout_waits_for_slow_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(std::time::Duration::from_millis(300))
                .set_body_json(json!({
                    "candidates": [{ "content": { "parts": [{ "text": "slow but fine" }] } }]
                })),
        )
        .mount(&server)
        .await;

    let config = GeminiConfig {
        base_url: server.uri(),
        model: "test-model".to_string(),
        timeout_secs: 0,
        ..GeminiConfig::default()
    };
    let client = GeminiClient::new(&config, "secret-key".to_string()).unwrap();
    let text = client.generate("hello").await.unwrap();
    assert_eq!(text.as_deref(), Some("slow but fine"));
}
