use std::time::Duration;

use musicconnect_provider::{
    create_provider, GeminiProvider, LlmProvider, LlmRequest, ProviderConfig,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_gemini_response(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 40, "candidatesTokenCount": 120}
    })
}

fn detail_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {"title": {"type": "STRING"}},
        "required": ["title"]
    })
}

#[tokio::test]
async fn gemini_json_mode_sends_schema_and_returns_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": detail_schema()
            }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(mock_gemini_response(r#"{"title":"X"}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = GeminiProvider::new("test-key").with_base_url(server.uri());
    let resp = provider
        .chat(LlmRequest::json(
            "gemini-2.5-flash".into(),
            "write a plan".into(),
            detail_schema(),
        ))
        .await
        .unwrap();

    assert_eq!(resp.text, r#"{"title":"X"}"#);
    assert_eq!(resp.input_tokens, Some(40));
    assert_eq!(resp.output_tokens, Some(120));
    assert_eq!(resp.stop_reason.as_deref(), Some("end_turn"));
}

#[tokio::test]
async fn gemini_server_error_is_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let provider = GeminiProvider::new("test-key").with_base_url(server.uri());
    let err = provider
        .chat(LlmRequest::simple("gemini-2.5-flash".into(), None, "hi".into()))
        .await
        .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("503"));
    assert!(msg.contains("[retryable]"));
    assert!(msg.contains("overloaded"));
}

#[tokio::test]
async fn gemini_bad_request_is_not_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {"code": 400, "message": "API key not valid"}
        })))
        .mount(&server)
        .await;

    let provider = GeminiProvider::new("wrong-key").with_base_url(server.uri());
    let err = provider
        .chat(LlmRequest::simple("gemini-2.5-flash".into(), None, "hi".into()))
        .await
        .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("400"));
    assert!(!msg.contains("[retryable]"));
    assert!(msg.contains("API key not valid"));
}

#[tokio::test]
async fn gemini_client_timeout_surfaces_as_retryable_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(mock_gemini_response("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let provider = GeminiProvider::with_timeout("test-key", Duration::from_millis(200))
        .with_base_url(server.uri());
    let err = provider
        .chat(LlmRequest::simple("gemini-2.5-flash".into(), None, "hi".into()))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("timeout"));
}

#[tokio::test]
async fn create_provider_honours_configured_base_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-pro:generateContent"))
        .and(header("x-goog-api-key", "cfg-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_gemini_response("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig {
        model: "gemini-2.5-pro".into(),
        ..ProviderConfig::default()
    }
    .with_api_key("cfg-key")
    .with_base_url(server.uri());

    let provider = create_provider(&config).unwrap();
    let resp = provider
        .chat(LlmRequest::simple(config.model.clone(), None, "ping".into()))
        .await
        .unwrap();
    assert_eq!(resp.text, "ok");
}
