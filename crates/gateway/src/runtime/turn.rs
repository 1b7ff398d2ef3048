//! Orchestration loop: the bounded model/tool cycle behind one chat
//! exchange.
//!
//! Entry point: [`run_turn`] spawns the exchange and returns a channel of
//! [`TurnEvent`]s. The synchronous API drains the channel, the streaming
//! API forwards it as SSE.

use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use pp_actions::infer::{infer_blocks, ChartIntent};
use pp_actions::{finalize, AllowList, RawOutput};
use pp_domain::agent::{
    AgentInput, AgentOutput, AgentSection, AgentUiBlock, ChatRole, ChatTurn, FALLBACK_ANSWER,
};
use pp_domain::error::{Error, Result};
use pp_domain::stream::StreamEvent;
use pp_domain::tool::{Message, ToolCall};
use pp_providers::{ChatRequest, Generation, LlmProvider, TerminalAnswer, ToolCallAssembler};
use pp_tools::{ToolError, ToolName, ToolRegistry};

use crate::state::AppState;

use super::phase::StreamPhase;
use super::prompt::system_prompt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TurnEvent
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Events emitted during one exchange, in wire order:
/// `MessageStart`, any `TextDelta`s, one `Ui` per block, one `Section` per
/// section, `Actions`, `Done`. `Error` replaces whatever would follow.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    MessageStart { session_id: String },
    TextDelta { delta: String },
    Ui { block: AgentUiBlock },
    Section { section: AgentSection },
    Actions { session_id: String, output: AgentOutput },
    /// Carries the complete output even though parts of it were already
    /// streamed.
    Done { session_id: String, output: AgentOutput, history_count: usize },
    Error { error: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Run parameters
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How the backend is driven for each model turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnMode {
    /// One complete response per turn.
    OneShot,
    /// Incremental response; text is forwarded as it arrives.
    Streaming,
}

/// Input to a single exchange. Unset or blank fields fall back to the
/// `[agent]` config.
#[derive(Debug, Clone, Default)]
pub struct TurnInput {
    pub session_id: String,
    pub message: String,
    pub timezone: Option<String>,
    pub locale: Option<String>,
    pub available_routes: Option<Vec<String>>,
    pub available_modals: Option<Vec<String>>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// run_turn
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run one exchange on a background task.
///
/// Cancelling `cancel` (or dropping the receiver) aborts the in-flight
/// model or tool call. A cancelled exchange records no history.
pub fn run_turn(
    state: AppState,
    input: TurnInput,
    mode: TurnMode,
    cancel: CancellationToken,
) -> mpsc::Receiver<TurnEvent> {
    let (tx, rx) = mpsc::channel::<TurnEvent>(64);

    let streaming = mode == TurnMode::Streaming;
    let turn_span = tracing::info_span!(
        "turn",
        session_id = %input.session_id,
        streaming,
        "otel.kind" = "SERVER",
    );
    tokio::spawn(
        async move {
            tracing::debug!("turn started");
            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("turn cancelled by caller");
                    return;
                }
                outcome = run_exchange(&state, input, mode, &tx) => outcome,
            };
            match outcome {
                Ok(()) => tracing::debug!("turn finished"),
                Err(e) if tx.is_closed() => {
                    tracing::debug!(error = %e, "caller went away mid-turn");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "turn failed");
                    let _ = tx.send(TurnEvent::Error { error: e.to_string() }).await;
                }
            }
        }
        .instrument(turn_span),
    );

    rx
}

async fn emit(tx: &mpsc::Sender<TurnEvent>, event: TurnEvent) -> Result<()> {
    tx.send(event)
        .await
        .map_err(|_| Error::Other("turn event receiver dropped".into()))
}

async fn run_exchange(
    state: &AppState,
    input: TurnInput,
    mode: TurnMode,
    tx: &mpsc::Sender<TurnEvent>,
) -> Result<()> {
    // Configuration problems surface before anything is streamed.
    let provider = state.llm.default_provider()?;

    let mut history = state.history.begin(&input.session_id).await;
    emit(tx, TurnEvent::MessageStart { session_id: input.session_id.clone() }).await?;

    let agent_cfg = &state.config.agent;
    let agent_input = AgentInput {
        message: input.message.clone(),
        history: history.turns(),
        timezone: non_blank(input.timezone)
            .unwrap_or_else(|| agent_cfg.default_timezone.clone()),
        locale: non_blank(input.locale).unwrap_or_else(|| agent_cfg.default_locale.clone()),
        available_routes: input.available_routes.unwrap_or_default(),
        available_modals: input.available_modals.unwrap_or_default(),
    };

    let output = run_agent(state, provider.as_ref(), &agent_input, mode, Some(tx)).await?;

    history.record_exchange(&input.message, &output.answer);
    let history_count = history.len();
    drop(history);

    for block in &output.ui {
        emit(tx, TurnEvent::Ui { block: block.clone() }).await?;
    }
    for section in &output.sections {
        emit(tx, TurnEvent::Section { section: section.clone() }).await?;
    }
    emit(
        tx,
        TurnEvent::Actions { session_id: input.session_id.clone(), output: output.clone() },
    )
    .await?;
    emit(tx, TurnEvent::Done { session_id: input.session_id, output, history_count }).await
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// run_agent: the tool loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Drive `provider` for up to `agent.max_turns` turns and normalize the
/// result.
///
/// Tool failures never end the loop; they go back to the model as error
/// observations. Only model/backend errors are returned. Every path that
/// produces an output passes through [`finalize`]. With `events` set and a
/// streaming `mode`, text fragments are sent as [`TurnEvent::TextDelta`].
pub async fn run_agent(
    state: &AppState,
    provider: &dyn LlmProvider,
    input: &AgentInput,
    mode: TurnMode,
    events: Option<&mpsc::Sender<TurnEvent>>,
) -> Result<AgentOutput> {
    let agent_cfg = &state.config.agent;
    let allow = AllowList::with_fallback(
        &input.available_routes,
        &input.available_modals,
        &agent_cfg.available_routes,
        &agent_cfg.available_modals,
    );

    let mut messages = Vec::with_capacity(input.history.len() + 2);
    messages.push(Message::system(system_prompt(&allow, &input.timezone, &input.locale)));
    messages.extend(input.history.iter().map(history_message));
    messages.push(Message::user(input.message.as_str()));

    let tool_defs = state.tools.definitions();
    let mut used_tools: Vec<String> = Vec::new();
    let mut last_overview: Option<Value> = None;
    let mut candidate: Option<TerminalAnswer> = None;
    let mut phase = StreamPhase::Start;

    for turn_idx in 0..agent_cfg.max_turns {
        phase = phase.begin_turn();
        tracing::debug!(turn_idx, messages = messages.len(), "model turn");

        let req = ChatRequest {
            messages: messages.clone(),
            tools: tool_defs.clone(),
            temperature: Some(state.config.llm.temperature),
            max_tokens: None,
            model: None,
        };
        let generation = match call_model(provider, &req, mode, &mut phase, events).await {
            Ok(g) => g,
            Err(e) => {
                phase = phase.fail();
                tracing::debug!(?phase, "model call failed");
                return Err(e);
            }
        };

        match generation {
            Generation::ToolCalls { text, calls } => {
                messages.push(Message::assistant_tool_calls(text, &calls));
                for call in &calls {
                    if !used_tools.contains(&call.tool_name) {
                        used_tools.push(call.tool_name.clone());
                    }
                    let (content, is_error) = match execute_tool(&state.tools, call).await {
                        Ok(value) => {
                            let content = value.to_string();
                            if call.tool_name == ToolName::GetFinanceOverview.as_str() {
                                last_overview = Some(value);
                            }
                            (content, false)
                        }
                        Err(e) => (e.to_observation().to_string(), true),
                    };
                    messages.push(Message::tool_result(
                        call.call_id.as_str(),
                        call.tool_name.as_str(),
                        content,
                        is_error,
                    ));
                }
            }
            Generation::Answer(answer) => {
                candidate = Some(answer);
                break;
            }
            Generation::Empty => {
                tracing::debug!(turn_idx, "model returned nothing");
                break;
            }
        }
    }
    phase = phase.finalize();

    let mut raw = match candidate {
        Some(TerminalAnswer { text, structured: true }) => {
            RawOutput::from_structured_text(&text).unwrap_or_else(|| RawOutput::text(text, Vec::new()))
        }
        Some(TerminalAnswer { text, structured: false }) => RawOutput::text(text, Vec::new()),
        None => {
            tracing::warn!(
                max_turns = agent_cfg.max_turns,
                used_tools = ?used_tools,
                "no terminal answer, using fallback"
            );
            RawOutput::text(FALLBACK_ANSWER, Vec::new())
        }
    };
    raw.used_tools = merge_used_tools(used_tools, std::mem::take(&mut raw.used_tools));

    if agent_cfg.infer_ui && raw.ui.is_empty() {
        if let Some(overview) = &last_overview {
            let intent = ChartIntent::detect(&input.message, &raw.answer);
            if intent.any() {
                raw.ui = infer_blocks(intent, overview);
            }
        }
    }

    let output = finalize(raw, &allow, chrono::Utc::now().timestamp_millis());
    phase = phase.done();
    tracing::debug!(
        ?phase,
        used_tools = ?output.used_tools,
        ui = output.ui.len(),
        sections = output.sections.len(),
        "exchange finalized"
    );
    Ok(output)
}

fn history_message(turn: &ChatTurn) -> Message {
    match turn.role {
        ChatRole::User => Message::user(turn.content.as_str()),
        ChatRole::Model => Message::assistant(turn.content.as_str()),
    }
}

/// Tools the loop actually ran, then any real tool names a structured
/// answer claims on top.
fn merge_used_tools(ran: Vec<String>, claimed: Vec<String>) -> Vec<String> {
    let mut out = ran;
    for name in claimed {
        if name.parse::<ToolName>().is_ok() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Model and tool calls
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn call_model(
    provider: &dyn LlmProvider,
    req: &ChatRequest,
    mode: TurnMode,
    phase: &mut StreamPhase,
    events: Option<&mpsc::Sender<TurnEvent>>,
) -> Result<Generation> {
    let structured = provider.structured_output();
    let streaming = mode == TurnMode::Streaming;
    let llm_call_span = tracing::info_span!(
        "llm.call",
        "otel.kind" = "CLIENT",
        provider = provider.provider_id(),
        streaming,
        input_tokens = tracing::field::Empty,
        output_tokens = tracing::field::Empty,
    );

    async move {
        if !streaming {
            let resp = provider.chat(req).await?;
            if let Some(usage) = &resp.usage {
                record_usage(usage);
            }
            return Ok(resp.into_generation(structured));
        }

        let mut stream = provider.chat_stream(req).await?;
        let mut text = String::new();
        let mut assembler = ToolCallAssembler::new(chrono::Utc::now().timestamp_millis());

        while let Some(event) = stream.next().await {
            let event = event?;
            if assembler.push_event(&event) {
                *phase = phase.on_tool_fragment();
                continue;
            }
            match event {
                StreamEvent::Token { text: chunk } => {
                    // Structured backends stream a JSON object, not prose.
                    if phase.forwards_text() && !structured {
                        if let Some(tx) = events {
                            emit(tx, TurnEvent::TextDelta { delta: chunk.clone() }).await?;
                        }
                    }
                    text.push_str(&chunk);
                }
                StreamEvent::Done { usage, .. } => {
                    if let Some(usage) = &usage {
                        record_usage(usage);
                    }
                }
                StreamEvent::Error { message } => {
                    return Err(Error::Provider {
                        provider: provider.provider_id().to_string(),
                        message,
                    });
                }
                StreamEvent::ToolCallFragment { .. } => {}
            }
        }

        Ok::<_, Error>(Generation::classify(text, assembler.finish(), structured))
    }
    .instrument(llm_call_span)
    .await
}

fn record_usage(usage: &pp_domain::stream::Usage) {
    let span = tracing::Span::current();
    span.record("input_tokens", usage.prompt_tokens);
    span.record("output_tokens", usage.completion_tokens);
}

async fn execute_tool(tools: &ToolRegistry, call: &ToolCall) -> std::result::Result<Value, ToolError> {
    let span = tracing::info_span!(
        "tool.exec",
        tool = %call.tool_name,
        call_id = %call.call_id,
    );
    let result = tools
        .execute(&call.tool_name, &call.arguments)
        .instrument(span)
        .await;
    if let Err(e) = &result {
        tracing::warn!(tool = %call.tool_name, error = %e, "tool call failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claimed_tools_must_exist_and_are_deduped() {
        let merged = merge_used_tools(
            vec!["calculate".into()],
            vec!["calculate".into(), "rm -rf".into(), "lookupFaq".into()],
        );
        assert_eq!(merged, vec!["calculate".to_string(), "lookupFaq".to_string()]);
    }

    #[test]
    fn history_roles_map_to_conversation_roles() {
        use pp_domain::tool::Role;
        assert_eq!(history_message(&ChatTurn::user("q")).role, Role::User);
        assert_eq!(history_message(&ChatTurn::model("a")).role, Role::Assistant);
    }

    #[test]
    fn blank_overrides_fall_back() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some("UTC".into())), Some("UTC".into()));
    }
}
