//! Scripted in-memory model backend shared by the gateway tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use pp_domain::config::Config;
use pp_domain::error::{Error, Result};
use pp_domain::stream::{BoxStream, StreamEvent};
use pp_domain::tool::ToolCall;
use pp_gateway::state::AppState;
use pp_providers::{ChatRequest, ChatResponse, LlmProvider, ProviderRegistry};
use pp_tools::ToolRegistry;

/// What the backend does on one model turn.
#[derive(Debug, Clone)]
pub enum Step {
    /// Request tools. `lead` is prose streamed before the first fragment,
    /// `trail` prose streamed after it.
    Tools { calls: Vec<(String, String)>, lead: String, trail: String },
    Text(String),
    Empty,
    Fail(String),
    /// Never answers.
    Hang,
}

impl Step {
    pub fn tools(calls: &[(&str, &str)]) -> Self {
        Step::Tools {
            calls: calls.iter().map(|(n, a)| (n.to_string(), a.to_string())).collect(),
            lead: String::new(),
            trail: String::new(),
        }
    }

    pub fn text(text: &str) -> Self {
        Step::Text(text.to_string())
    }
}

pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    /// Replayed once the script runs out.
    fallback: Step,
    structured: bool,
    calls: AtomicUsize,
    pub seen: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback: Step::Empty,
            structured: false,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(step: Step) -> Self {
        let mut p = Self::new(Vec::new());
        p.fallback = step;
        p
    }

    pub fn structured(mut self) -> Self {
        self.structured = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self, req: &ChatRequest) -> Step {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(req.clone());
        self.steps
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

fn tool_calls(calls: &[(String, String)], turn: usize) -> Vec<ToolCall> {
    calls
        .iter()
        .enumerate()
        .map(|(i, (name, args))| ToolCall {
            call_id: format!("call_{turn}_{i}"),
            tool_name: name.clone(),
            arguments: args.clone(),
        })
        .collect()
}

/// Split `s` into pieces of at most `n` chars.
fn pieces(s: &str, n: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    chars.chunks(n).map(|c| c.iter().collect()).collect()
}

fn done() -> StreamEvent {
    StreamEvent::Done { usage: None, finish_reason: Some("stop".into()) }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let turn = self.call_count();
        match self.next_step(req) {
            Step::Tools { calls, lead, trail } => Ok(ChatResponse {
                content: format!("{lead}{trail}"),
                tool_calls: tool_calls(&calls, turn),
                ..Default::default()
            }),
            Step::Text(text) => Ok(ChatResponse { content: text, ..Default::default() }),
            Step::Empty => Ok(ChatResponse::default()),
            Step::Fail(message) => Err(Error::Provider { provider: "scripted".into(), message }),
            Step::Hang => std::future::pending().await,
        }
    }

    async fn chat_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let mut events = Vec::new();
        match self.next_step(req) {
            Step::Tools { calls, lead, trail } => {
                events.extend(pieces(&lead, 3).into_iter().map(|text| StreamEvent::Token { text }));
                for (index, (name, args)) in calls.iter().enumerate() {
                    // Ids are left out so the aggregator has to synthesize them.
                    for piece in pieces(name, 4) {
                        events.push(StreamEvent::ToolCallFragment {
                            index,
                            id: None,
                            name: Some(piece),
                            arguments: None,
                        });
                    }
                    for piece in pieces(args, 2) {
                        events.push(StreamEvent::ToolCallFragment {
                            index,
                            id: None,
                            name: None,
                            arguments: Some(piece),
                        });
                    }
                }
                events.extend(pieces(&trail, 3).into_iter().map(|text| StreamEvent::Token { text }));
                events.push(done());
            }
            Step::Text(text) => {
                events.extend(pieces(&text, 3).into_iter().map(|text| StreamEvent::Token { text }));
                events.push(done());
            }
            Step::Empty => events.push(done()),
            Step::Fail(message) => events.push(StreamEvent::Error { message }),
            Step::Hang => std::future::pending::<()>().await,
        }
        Ok(Box::pin(futures_util::stream::iter(events.into_iter().map(Ok))))
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }

    fn structured_output(&self) -> bool {
        self.structured
    }
}

pub fn state_with(provider: Arc<ScriptedProvider>) -> AppState {
    state_with_config(provider, Config::default())
}

pub fn state_with_config(provider: Arc<ScriptedProvider>, config: Config) -> AppState {
    let config = Arc::new(config);
    let llm = ProviderRegistry::from_providers(vec![provider as Arc<dyn LlmProvider>]);
    let tools = ToolRegistry::from_config(&config).expect("tool registry");
    AppState::new(config, llm, tools)
}

pub fn state_without_providers() -> AppState {
    let config = Arc::new(Config::default());
    let tools = ToolRegistry::from_config(&config).expect("tool registry");
    AppState::new(config, ProviderRegistry::from_providers(Vec::new()), tools)
}
