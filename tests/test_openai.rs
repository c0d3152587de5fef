//! Integration tests for the OpenAI-compatible provider
//!
//! Tests behavioral contracts against a wiremock chat completions API:
//! - request/response handling and token usage
//! - tool definitions on the wire and tool calls in responses
//! - error status mapping

use ratings_agent::llm::provider::{
    CompletionRequest, FinishReason, LlmError, LlmProvider, Message,
};
use ratings_agent::llm::providers::openai::{OpenAiConfig, OpenAiProvider};
use ratings_agent::tools::ToolDescription;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> OpenAiConfig {
    OpenAiConfig {
        api_key: "test-api-key".to_string(),
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
    }
}

fn test_request(model: &str) -> CompletionRequest {
    CompletionRequest {
        messages: vec![Message::system("Be brief."), Message::user("Hello")],
        model: model.to_string(),
        max_tokens: Some(100),
        temperature: Some(0.7),
        tools: None,
    }
}

fn completion(content: serde_json::Value, finish_reason: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "model": "gemini-2.0-flash",
        "choices": [{
            "index": 0,
            "message": content,
            "finish_reason": finish_reason
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 15, "total_tokens": 25}
    })
}

#[tokio::test]
async fn test_openai_provider_returns_successful_completion_with_valid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-api-key"))
        .and(body_partial_json(json!({
            "model": "gemini-2.0-flash",
            "max_tokens": 100,
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "Hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            json!({"role": "assistant", "content": "Hello! How can I help?"}),
            "stop",
        )))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let response = provider
        .complete(test_request("gemini-2.0-flash"))
        .await
        .unwrap();

    assert_eq!(response.content.as_deref(), Some("Hello! How can I help?"));
    assert_eq!(response.model, "gemini-2.0-flash");
    assert_eq!(response.usage.total_tokens, 25);
    assert_eq!(response.finish_reason, FinishReason::Stop);
    assert!(response.tool_calls.is_none());
}

#[tokio::test]
async fn test_openai_provider_sends_tools_and_parses_tool_calls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "tools": [{
                "type": "function",
                "function": {"name": "get-playstore-rating"}
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_abc",
                    "type": "function",
                    "function": {
                        "name": "get-playstore-rating",
                        "arguments": "{\"appName\":\"Spotify\"}"
                    }
                }]
            }),
            "tool_calls",
        )))
        .mount(&mock_server)
        .await;

    let mut request = test_request("gemini-2.0-flash");
    request.tools = Some(vec![ToolDescription {
        name: "get-playstore-rating".to_string(),
        description: "Get current ratings".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {"appName": {"type": "string"}},
            "required": ["appName"]
        }),
    }]);

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let response = provider.complete(request).await.unwrap();

    assert_eq!(response.finish_reason, FinishReason::ToolCalls);
    let calls = response.tool_calls.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "call_abc");
    assert_eq!(calls[0].name, "get-playstore-rating");
    assert_eq!(calls[0].arguments, json!({"appName": "Spotify"}));
}

#[tokio::test]
async fn test_openai_provider_maps_auth_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider.complete(test_request("gpt-4")).await;

    assert!(matches!(result, Err(LlmError::AuthenticationFailed(_))));
}

#[tokio::test]
async fn test_openai_provider_maps_rate_limit_without_retrying() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider.complete(test_request("gpt-4")).await;

    assert!(matches!(result, Err(LlmError::RateLimitExceeded(_))));
}

#[tokio::test]
async fn test_openai_provider_maps_server_error_to_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider.complete(test_request("gpt-4")).await;

    assert!(matches!(result, Err(LlmError::ApiError(message)) if message.contains("boom")));
}

#[tokio::test]
async fn test_openai_provider_rejects_empty_choices() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4",
            "choices": []
        })))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider.complete(test_request("gpt-4")).await;

    assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_openai_provider_health_check_lists_models() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models"))
        .and(header("Authorization", "Bearer test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();

    assert!(provider.health_check().await.is_ok());
}
