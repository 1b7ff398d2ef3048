//! Drives the OpenAI-compatible adapter against a local axum server.

use std::time::Duration;

use axum::{http::header, response::IntoResponse, routing::post, Json, Router};
use futures_util::StreamExt;
use pp_domain::config::{AuthConfig, ProviderConfig, ProviderKind};
use pp_domain::stream::StreamEvent;
use pp_domain::tool::Message;
use pp_providers::openai_compat::OpenAiCompatProvider;
use pp_providers::{ChatRequest, LlmProvider, ToolCallAssembler};
use serde_json::{json, Value};

const STREAM_BODY: &str = concat!(
    "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"type\":\"function\",\"function\":{\"name\":\"get\",\"arguments\":\"\"}}]}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"name\":\"Time\",\"arguments\":\"{\\\"timez\"}}]}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"one\\\":\\\"UTC\\\"}\"}}]}}]}\r\n\r\n",
    "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n",
    "data: [DONE]\n\n",
);

async fn completions(Json(body): Json<Value>) -> axum::response::Response {
    if body["stream"] == json!(true) {
        ([(header::CONTENT_TYPE, "text/event-stream")], STREAM_BODY).into_response()
    } else {
        Json(json!({
            "model": body["model"],
            "choices": [{
                "message": { "role": "assistant", "content": "Hello there" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5 }
        }))
        .into_response()
    }
}

async fn spawn_server() -> String {
    let app = Router::new().route("/v1/chat/completions", post(completions));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v1")
}

fn provider(base_url: String) -> OpenAiCompatProvider {
    let cfg = ProviderConfig {
        id: "mock".into(),
        kind: ProviderKind::OpenaiCompat,
        base_url,
        auth: AuthConfig { key: Some("test-key".into()), ..Default::default() },
        default_model: Some("mock-model".into()),
        structured_output: false,
    };
    OpenAiCompatProvider::from_config(&cfg, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn streamed_fragments_reassemble_into_one_call() {
    let p = provider(spawn_server().await);
    let req = ChatRequest {
        messages: vec![Message::user("what time is it?")],
        ..Default::default()
    };

    let mut stream = p.chat_stream(&req).await.unwrap();
    let mut assembler = ToolCallAssembler::new(1_700_000_000_000);
    let mut done = 0;
    while let Some(event) = stream.next().await {
        let event = event.unwrap();
        if matches!(event, StreamEvent::Done { .. }) {
            done += 1;
        }
        assembler.push_event(&event);
    }

    let calls = assembler.finish();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].call_id, "call_1");
    assert_eq!(calls[0].tool_name, "getTime");
    assert_eq!(calls[0].arguments, "{\"timezone\":\"UTC\"}");
    assert!(done >= 1);
}

#[tokio::test]
async fn one_shot_chat_returns_text_and_usage() {
    let p = provider(spawn_server().await);
    let req = ChatRequest {
        messages: vec![Message::system("sys"), Message::user("hi")],
        temperature: Some(0.2),
        ..Default::default()
    };

    let resp = p.chat(&req).await.unwrap();
    assert_eq!(resp.content, "Hello there");
    assert!(resp.tool_calls.is_empty());
    assert_eq!(resp.model, "mock-model");
    assert_eq!(resp.usage.unwrap().total_tokens, 5);
}

#[tokio::test]
async fn upstream_error_status_is_a_provider_error() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            (
                axum::http::StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": { "message": "rate limited" } })),
            )
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let p = provider(format!("http://{addr}/v1"));
    let err = p.chat(&ChatRequest::default()).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("429"), "{msg}");
    assert!(msg.contains("rate limited"), "{msg}");
}
