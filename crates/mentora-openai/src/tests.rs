// Unit tests for the OpenAI client, against a wiremock server

use crate::OpenAiClient;
use mentora_core::{ChatMessage, ChatOptions, EchoTool, LlmClient};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OpenAiClient {
    OpenAiClient::with_base_url("test-key", format!("{}/v1/chat/completions", server.uri()))
        .with_default_model("gpt-4o-mini")
}

fn completion_body(message: serde_json::Value) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{ "index": 0, "message": message, "finish_reason": "stop" }]
    })
}

#[test]
fn debug_redacts_the_api_key() {
    let client = OpenAiClient::new("secret-key");
    let rendered = format!("{:?}", client);
    assert!(rendered.contains("[REDACTED]"));
    assert!(!rendered.contains("secret-key"));
}

#[tokio::test]
async fn chat_returns_the_reply_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json!({
            "role": "assistant",
            "content": "Hello, student!"
        }))))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let reply = client
        .chat(&[ChatMessage::user("hi")], &ChatOptions::new())
        .await
        .unwrap();
    assert_eq!(reply.text, "Hello, student!");
}

#[tokio::test]
async fn explicit_model_overrides_the_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "gpt-4.1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json!({
            "role": "assistant",
            "content": "ok"
        }))))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let reply = client
        .chat(
            &[ChatMessage::user("hi")],
            &ChatOptions::new().with_model("gpt-4.1"),
        )
        .await
        .unwrap();
    assert_eq!(reply.text, "ok");
}

#[tokio::test]
async fn structured_output_parses_the_json_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(
            json!({ "response_format": { "type": "json_schema" } }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json!({
            "role": "assistant",
            "content": "{\"modules\": [\"Basics\", \"Practice\"]}"
        }))))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let schema = json!({ "type": "object", "properties": { "modules": { "type": "array" } } });
    let value = client
        .structured_output(&[ChatMessage::user("plan it")], &schema, &ChatOptions::new())
        .await
        .unwrap();
    assert_eq!(value["modules"][0], "Basics");
}

#[tokio::test]
async fn structured_output_rejects_non_json_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json!({
            "role": "assistant",
            "content": "not json at all"
        }))))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .structured_output(&[], &json!({}), &ChatOptions::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not valid JSON"));
}

#[tokio::test]
async fn chat_with_tools_runs_the_tool_and_returns_the_followup_reply() {
    let server = MockServer::start().await;

    // First round: the model asks for the echo tool
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": { "name": "echo", "arguments": "{\"message\": \"ping\"}" }
            }]
        }))))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    // Second round: the model answers using the tool result
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json!({
            "role": "assistant",
            "content": "the echo said ping"
        }))))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let tools: Vec<Arc<dyn mentora_core::Tool>> = vec![Arc::new(EchoTool)];
    let reply = client
        .chat_with_tools(&[ChatMessage::user("use echo")], &tools, &ChatOptions::new())
        .await
        .unwrap();
    assert_eq!(reply.text, "the echo said ping");
}

#[tokio::test]
async fn unknown_tool_call_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": { "name": "missing", "arguments": "{}" }
            }]
        }))))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .chat_with_tools(&[ChatMessage::user("go")], &[], &ChatOptions::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unknown tool"));
}

#[tokio::test]
async fn api_errors_surface_with_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429).set_body_string("{\"error\": \"rate limited\"}"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .chat(&[ChatMessage::user("hi")], &ChatOptions::new())
        .await
        .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("429"));
    assert!(text.contains("rate limited"));
}

#[tokio::test]
async fn missing_model_is_reported_before_any_request() {
    let client = OpenAiClient::new("key");
    let err = client
        .chat(&[ChatMessage::user("hi")], &ChatOptions::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no model configured"));
}
