use pp_domain::error::Result;
use pp_domain::stream::Usage;
use pp_domain::stream::{BoxStream, StreamEvent};
use pp_domain::tool::{Message, ToolCall, ToolDefinition};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider-agnostic chat completion request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// The conversation messages to send.
    pub messages: Vec<Message>,
    /// Tool definitions the model may invoke.
    pub tools: Vec<ToolDefinition>,
    /// Sampling temperature (0.0 – 2.0). `None` lets the provider choose.
    pub temperature: Option<f32>,
    /// Maximum tokens in the response. `None` lets the provider choose.
    pub max_tokens: Option<u32>,
    /// Model identifier override. When `None`, the provider uses its default.
    pub model: Option<String>,
}

/// A provider-agnostic chat completion response.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    /// Textual content of the response.
    pub content: String,
    /// Tool calls emitted by the model.
    pub tool_calls: Vec<ToolCall>,
    /// Token usage information.
    pub usage: Option<Usage>,
    /// The model that actually produced the response.
    pub model: String,
    /// The reason the model stopped generating (e.g. "stop", "tool_calls").
    pub finish_reason: Option<String>,
}

/// The final message of a turn that requested no tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalAnswer {
    pub text: String,
    /// The backend was asked to phrase this message as an AgentOutput JSON
    /// object; callers should try that shape before treating it as prose.
    pub structured: bool,
}

/// What one model turn amounts to, from the orchestration loop's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Answer(TerminalAnswer),
    /// Tool calls to execute before re-prompting. `text` is whatever prose
    /// accompanied them, kept for the assistant placeholder turn.
    ToolCalls { text: String, calls: Vec<ToolCall> },
    Empty,
}

impl Generation {
    /// Classify a turn. Tool calls win over text; whitespace-only text
    /// counts as empty.
    pub fn classify(text: String, calls: Vec<ToolCall>, structured: bool) -> Self {
        if !calls.is_empty() {
            Generation::ToolCalls { text, calls }
        } else if text.trim().is_empty() {
            Generation::Empty
        } else {
            Generation::Answer(TerminalAnswer { text, structured })
        }
    }
}

impl ChatResponse {
    pub fn into_generation(self, structured: bool) -> Generation {
        Generation::classify(self.content, self.tool_calls, structured)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait that every model backend adapter must implement.
///
/// Implementations translate between the internal message types and the
/// wire format of one provider's HTTP API. The orchestration loop depends
/// only on this trait.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request and wait for the full response.
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse>;

    /// Send a chat completion request and return a stream of events.
    async fn chat_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>>;

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;

    /// Whether this backend asks the model for a structured terminal
    /// message (see [`TerminalAnswer::structured`]).
    fn structured_output(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str) -> ToolCall {
        ToolCall { call_id: "c".into(), tool_name: name.into(), arguments: "{}".into() }
    }

    #[test]
    fn tool_calls_take_precedence_over_text() {
        let g = Generation::classify("thinking...".into(), vec![call("calculate")], false);
        assert!(matches!(g, Generation::ToolCalls { ref calls, .. } if calls.len() == 1));
    }

    #[test]
    fn blank_text_is_empty() {
        assert_eq!(Generation::classify("  \n".into(), vec![], false), Generation::Empty);
    }

    #[test]
    fn text_is_terminal() {
        let g = ChatResponse { content: "hi".into(), ..Default::default() }.into_generation(true);
        assert_eq!(
            g,
            Generation::Answer(TerminalAnswer { text: "hi".into(), structured: true })
        );
    }
}
