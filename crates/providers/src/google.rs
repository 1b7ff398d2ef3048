//! Google Gemini adapter.
//!
//! Implements the Gemini `generateContent` and `streamGenerateContent` APIs.
//! Auth is via the `x-goog-api-key` header unless the provider config
//! overrides the header name.
//!
//! When `structured_output` is on, the system instruction gains an output
//! contract describing the agent output object. `responseMimeType` is not
//! used because Gemini rejects it together with function declarations.

use std::time::Duration;

use crate::traits::{ChatRequest, ChatResponse, LlmProvider};
use crate::util::{error_message, from_reqwest, output_contract, resolve_api_key};
use pp_domain::config::ProviderConfig;
use pp_domain::error::{Error, Result};
use pp_domain::stream::{BoxStream, StreamEvent, Usage};
use pp_domain::tool::{ContentPart, Message, MessageContent, Role, ToolCall, ToolDefinition};
use serde_json::Value;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An LLM provider adapter for the Google Gemini API.
pub struct GoogleProvider {
    id: String,
    base_url: String,
    api_key: String,
    auth_header: String,
    default_model: String,
    structured_output: bool,
    client: reqwest::Client,
}

impl GoogleProvider {
    /// Create a new provider from the deserialized provider config.
    pub fn from_config(cfg: &ProviderConfig, timeout: Duration) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            auth_header: cfg.auth.header.clone().unwrap_or_else(|| "x-goog-api-key".into()),
            default_model: cfg
                .default_model
                .clone()
                .unwrap_or_else(|| "gemini-2.5-flash".into()),
            structured_output: cfg.structured_output,
            client,
        })
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn stream_url(&self, model: &str) -> String {
        format!("{}/models/{}:streamGenerateContent?alt=sse", self.base_url, model)
    }

    fn model_for(&self, req: &ChatRequest) -> String {
        req.model.clone().unwrap_or_else(|| self.default_model.clone())
    }

    fn build_body(&self, req: &ChatRequest) -> Value {
        let mut contents: Vec<Value> = Vec::new();
        let mut system_text = String::new();

        for msg in &req.messages {
            match msg.role {
                Role::System => {
                    if !system_text.is_empty() {
                        system_text.push_str("\n\n");
                    }
                    system_text.push_str(&msg.content.text().unwrap_or_default());
                }
                Role::User => contents.push(serde_json::json!({
                    "role": "user",
                    "parts": [{ "text": msg.content.text().unwrap_or_default() }],
                })),
                Role::Assistant => contents.push(assistant_to_gemini(msg)),
                Role::Tool => contents.push(tool_result_to_gemini(msg)),
            }
        }

        if self.structured_output {
            if !system_text.is_empty() {
                system_text.push_str("\n\n");
            }
            system_text.push_str(&output_contract());
        }

        let mut body = serde_json::json!({ "contents": contents });

        if !system_text.is_empty() {
            body["systemInstruction"] = serde_json::json!({ "parts": [{ "text": system_text }] });
        }

        if !req.tools.is_empty() {
            let function_declarations: Vec<Value> = req.tools.iter().map(tool_to_gemini).collect();
            body["tools"] = serde_json::json!([{
                "functionDeclarations": function_declarations,
            }]);
        }

        let mut gen_config = serde_json::json!({});
        if let Some(temp) = req.temperature {
            gen_config["temperature"] = serde_json::json!(temp);
        }
        if let Some(max) = req.max_tokens {
            gen_config["maxOutputTokens"] = serde_json::json!(max);
        }
        if gen_config.as_object().is_some_and(|o| !o.is_empty()) {
            body["generationConfig"] = gen_config;
        }

        body
    }

    async fn post(&self, url: &str, body: &Value) -> Result<reqwest::Response> {
        tracing::debug!(provider = %self.id, url = %url, "gemini request");

        let resp = self
            .client
            .post(url)
            .header(&self.auth_header, &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), error_message(&err_text)),
            });
        }
        Ok(resp)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message serialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn assistant_to_gemini(msg: &Message) -> Value {
    let mut parts: Vec<Value> = Vec::new();
    match &msg.content {
        MessageContent::Text(t) => parts.push(serde_json::json!({ "text": t })),
        MessageContent::Parts(ps) => {
            for p in ps {
                match p {
                    ContentPart::Text { text } if !text.is_empty() => {
                        parts.push(serde_json::json!({ "text": text }));
                    }
                    ContentPart::ToolUse { name, arguments, .. } => {
                        // Gemini wants an object; undecodable argument text
                        // is replayed as an empty one.
                        let args = serde_json::from_str::<Value>(arguments)
                            .ok()
                            .filter(Value::is_object)
                            .unwrap_or_else(|| serde_json::json!({}));
                        parts.push(serde_json::json!({
                            "functionCall": { "name": name, "args": args }
                        }));
                    }
                    _ => {}
                }
            }
        }
    }
    serde_json::json!({ "role": "model", "parts": parts })
}

/// Gemini keys `functionResponse` by function name, not call id.
fn tool_result_to_gemini(msg: &Message) -> Value {
    let parts: Vec<Value> = match &msg.content {
        MessageContent::Parts(ps) => ps
            .iter()
            .filter_map(|p| match p {
                ContentPart::ToolResult { tool_name, content, .. } => {
                    let response = serde_json::from_str::<Value>(content)
                        .ok()
                        .filter(Value::is_object)
                        .unwrap_or_else(|| serde_json::json!({ "content": content }));
                    Some(serde_json::json!({
                        "functionResponse": { "name": tool_name, "response": response }
                    }))
                }
                _ => None,
            })
            .collect(),
        MessageContent::Text(t) => vec![serde_json::json!({
            "functionResponse": { "name": "unknown", "response": { "content": t } }
        })],
    };
    serde_json::json!({ "role": "user", "parts": parts })
}

fn tool_to_gemini(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": tool.parameters,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_gemini_response(body: &Value, model: &str) -> ChatResponse {
    let Some(candidate) = body
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
    else {
        return ChatResponse { model: model.to_string(), ..Default::default() };
    };

    let mut content = String::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();

    for part in candidate_parts(candidate) {
        if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
            content.push_str(text);
        }
        if let Some(fc) = part.get("functionCall") {
            tool_calls.push(ToolCall {
                call_id: fc
                    .get("id")
                    .and_then(|v| v.as_str())
                    .map(String::from)
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4())),
                tool_name: fc.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                arguments: fc.get("args").map(Value::to_string).unwrap_or_default(),
            });
        }
    }

    ChatResponse {
        content,
        tool_calls,
        usage: body.get("usageMetadata").and_then(parse_gemini_usage),
        model: model.to_string(),
        finish_reason: candidate
            .get("finishReason")
            .and_then(|v| v.as_str())
            .map(map_finish_reason),
    }
}

fn candidate_parts(candidate: &Value) -> impl Iterator<Item = &Value> {
    candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .into_iter()
        .flatten()
}

fn map_finish_reason(s: &str) -> String {
    match s {
        "STOP" => "stop".to_string(),
        "MAX_TOKENS" => "length".to_string(),
        other => other.to_lowercase(),
    }
}

fn parse_gemini_usage(v: &Value) -> Option<Usage> {
    let prompt = v.get("promptTokenCount")?.as_u64()? as u32;
    let completion = v.get("candidatesTokenCount").and_then(|c| c.as_u64()).unwrap_or(0) as u32;
    let total = v
        .get("totalTokenCount")
        .and_then(|v| v.as_u64())
        .unwrap_or((prompt + completion) as u64) as u32;
    Some(Usage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: total,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streaming helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Gemini streams whole function calls, one per part. Each one gets the
/// next fragment index so the assembler treats them as separate calls.
#[derive(Default)]
struct GeminiStreamState {
    next_index: usize,
}

impl GeminiStreamState {
    fn parse(&mut self, data: &str) -> Vec<Result<StreamEvent>> {
        let v: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => return vec![Err(Error::Json(e))],
        };

        if let Some(err) = v.get("error") {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("stream error")
                .to_string();
            return vec![Ok(StreamEvent::Error { message })];
        }

        let mut events = Vec::new();
        let Some(candidate) = v
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|a| a.first())
        else {
            return events;
        };

        for part in candidate_parts(candidate) {
            if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
                if !text.is_empty() {
                    events.push(Ok(StreamEvent::Token { text: text.to_string() }));
                }
            }
            if let Some(fc) = part.get("functionCall") {
                let index = self.next_index;
                self.next_index += 1;
                events.push(Ok(StreamEvent::ToolCallFragment {
                    index,
                    id: fc.get("id").and_then(|v| v.as_str()).map(String::from),
                    name: fc.get("name").and_then(|v| v.as_str()).map(String::from),
                    arguments: fc.get("args").map(Value::to_string),
                }));
            }
        }

        if let Some(reason) = candidate.get("finishReason").and_then(|f| f.as_str()) {
            events.push(Ok(StreamEvent::Done {
                usage: v.get("usageMetadata").and_then(parse_gemini_usage),
                finish_reason: Some(map_finish_reason(reason)),
            }));
        }

        events
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for GoogleProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let model = self.model_for(req);
        let body = self.build_body(req);
        let resp = self.post(&self.generate_url(&model), &body).await?;
        let resp_text = resp.text().await.map_err(from_reqwest)?;
        let resp_json: Value = serde_json::from_str(&resp_text)?;
        Ok(parse_gemini_response(&resp_json, &model))
    }

    async fn chat_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let model = self.model_for(req);
        let body = self.build_body(req);
        let resp = self.post(&self.stream_url(&model), &body).await?;

        let mut state = GeminiStreamState::default();
        Ok(crate::sse::sse_response_stream(resp, move |data| state.parse(data)))
    }

    fn provider_id(&self) -> &str {
        &self.id
    }

    fn structured_output(&self) -> bool {
        self.structured_output
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
