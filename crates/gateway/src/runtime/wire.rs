//! SSE wire format for [`TurnEvent`]s, both directions.
//!
//! Every event is one `event:` line naming the kind and one `data:` line
//! holding a camelCase JSON payload. The decoder tolerates CRLF line
//! endings, arbitrary chunk boundaries and keep-alive comments.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use pp_domain::agent::{AgentAction, AgentOutput, AgentSection, AgentUiBlock};

use super::turn::TurnEvent;

/// Body of a finished exchange: the synchronous chat response, and the
/// payload of the `actions` and `done` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub session_id: String,
    #[serde(flatten)]
    pub output: AgentOutput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_count: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed {event} payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Encoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// SSE event name and JSON payload for one event.
pub fn encode(event: &TurnEvent) -> (&'static str, Value) {
    match event {
        TurnEvent::MessageStart { session_id } => {
            ("message_start", json!({ "sessionId": session_id }))
        }
        TurnEvent::TextDelta { delta } => ("text_delta", json!({ "delta": delta })),
        TurnEvent::Ui { block } => ("ui", json!({ "block": block })),
        TurnEvent::Section { section } => ("section", json!({ "section": section })),
        TurnEvent::Actions { session_id, output } => (
            "actions",
            reply_value(ChatReply {
                session_id: session_id.clone(),
                output: output.clone(),
                history_count: None,
            }),
        ),
        TurnEvent::Done { session_id, output, history_count } => (
            "done",
            reply_value(ChatReply {
                session_id: session_id.clone(),
                output: output.clone(),
                history_count: Some(*history_count),
            }),
        ),
        TurnEvent::Error { error } => ("error", json!({ "error": error })),
    }
}

fn reply_value(reply: ChatReply) -> Value {
    serde_json::to_value(reply).unwrap_or_else(|e| json!({ "error": e.to_string() }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Decoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Incremental decoder for the consuming side of a chat stream.
#[derive(Debug, Default)]
pub struct WireDecoder {
    buffer: String,
}

impl WireDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of the response body. Returns every event completed
    /// by it, in order.
    pub fn push(&mut self, chunk: &str) -> Vec<Result<TurnEvent, WireError>> {
        self.buffer.push_str(chunk);
        if self.buffer.contains('\r') {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..pos + 2).collect();
            if let Some(event) = decode_block(&block) {
                out.push(event);
            }
        }
        out
    }

    /// Decode whatever is left once the body has ended.
    pub fn finish(mut self) -> Option<Result<TurnEvent, WireError>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_block(&rest)
    }
}

fn decode_block(block: &str) -> Option<Result<TurnEvent, WireError>> {
    let mut name = "message";
    let mut data: Vec<&str> = Vec::new();
    for line in block.lines().map(str::trim_end) {
        if let Some(rest) = line.strip_prefix("event:") {
            name = rest.trim();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data.push(rest.trim());
        }
    }
    if data.is_empty() {
        return None;
    }
    decode_event(name, &data.join("\n"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageStartPayload {
    session_id: String,
}

#[derive(Deserialize)]
struct TextDeltaPayload {
    delta: String,
}

#[derive(Deserialize)]
struct UiPayload {
    block: AgentUiBlock,
}

#[derive(Deserialize)]
struct SectionPayload {
    section: AgentSection,
}

fn decode_event(name: &str, data: &str) -> Option<Result<TurnEvent, WireError>> {
    fn parse<T: serde::de::DeserializeOwned>(name: &str, data: &str) -> Result<T, WireError> {
        serde_json::from_str(data).map_err(|source| WireError::Payload {
            event: name.to_string(),
            source,
        })
    }

    let event = match name {
        "message_start" => parse::<MessageStartPayload>(name, data)
            .map(|p| TurnEvent::MessageStart { session_id: p.session_id }),
        "text_delta" => {
            parse::<TextDeltaPayload>(name, data).map(|p| TurnEvent::TextDelta { delta: p.delta })
        }
        "ui" => parse::<UiPayload>(name, data).map(|p| TurnEvent::Ui { block: p.block }),
        "section" => {
            parse::<SectionPayload>(name, data).map(|p| TurnEvent::Section { section: p.section })
        }
        "actions" => parse::<ChatReply>(name, data).map(|r| TurnEvent::Actions {
            session_id: r.session_id,
            output: r.output,
        }),
        "done" => parse::<ChatReply>(name, data).map(|r| TurnEvent::Done {
            session_id: r.session_id,
            output: r.output,
            history_count: r.history_count.unwrap_or_default(),
        }),
        "error" => {
            let error = serde_json::from_str::<Value>(data)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| "agent stream failed".to_string());
            Ok(TurnEvent::Error { error })
        }
        other => {
            tracing::debug!(event = other, "ignoring unknown stream event");
            return None;
        }
    };
    Some(event)
}

/// Actions a client should apply, with the top-level targets appended
/// when the action list has no entry of that kind.
pub fn merge_actions(output: &AgentOutput) -> Vec<AgentAction> {
    let mut actions = output.actions.clone();
    if let Some(to) = &output.navigate_to {
        if !actions.iter().any(|a| matches!(a, AgentAction::Navigate { .. })) {
            actions.push(AgentAction::Navigate { to: to.clone() });
        }
    }
    if let Some(id) = &output.open_modal_id {
        if !actions.iter().any(|a| matches!(a, AgentAction::OpenModal { .. })) {
            actions.push(AgentAction::OpenModal { id: id.clone() });
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use pp_domain::agent::DonutSlice;

    fn frame(event: &TurnEvent) -> String {
        let (name, data) = encode(event);
        format!("event: {name}\ndata: {data}\n\n")
    }

    fn output() -> AgentOutput {
        AgentOutput {
            answer: "Sure.".into(),
            used_tools: vec!["getFinanceOverview".into()],
            navigate_to: Some("/pricing".into()),
            actions: vec![AgentAction::Navigate { to: "/pricing".into() }],
            ..Default::default()
        }
    }

    #[test]
    fn done_payload_is_flat_camel_case() {
        let (name, data) = encode(&TurnEvent::Done {
            session_id: "s1".into(),
            output: output(),
            history_count: 4,
        });
        assert_eq!(name, "done");
        assert_eq!(data["sessionId"], "s1");
        assert_eq!(data["answer"], "Sure.");
        assert_eq!(data["navigateTo"], "/pricing");
        assert_eq!(data["historyCount"], 4);
        assert!(data.get("openModalId").is_none());
    }

    #[test]
    fn actions_payload_has_no_history_count() {
        let (_, data) = encode(&TurnEvent::Actions { session_id: "s1".into(), output: output() });
        assert!(data.get("historyCount").is_none());
        assert_eq!(data["actions"][0]["type"], "navigate");
    }

    #[test]
    fn decodes_across_arbitrary_chunk_boundaries() {
        let events = vec![
            TurnEvent::MessageStart { session_id: "s1".into() },
            TurnEvent::TextDelta { delta: "Hel".into() },
            TurnEvent::Ui {
                block: AgentUiBlock::AssetDonut {
                    title: None,
                    items: vec![DonutSlice { label: "Cash".into(), amount: 10.0 }],
                },
            },
            TurnEvent::Done { session_id: "s1".into(), output: output(), history_count: 2 },
        ];
        let body: String = events.iter().map(frame).collect::<String>().replace('\n', "\r\n");

        let mut decoder = WireDecoder::new();
        let mut decoded = Vec::new();
        let bytes = body.as_bytes();
        for chunk in bytes.chunks(7) {
            decoded.extend(decoder.push(std::str::from_utf8(chunk).unwrap()));
        }
        let decoded: Vec<TurnEvent> = decoded.into_iter().map(Result::unwrap).collect();
        assert_eq!(decoded, events);
    }

    #[test]
    fn skips_keep_alive_comments_and_unknown_events() {
        let mut decoder = WireDecoder::new();
        let out = decoder.push(":\n\nevent: ping\ndata: {}\n\nevent: text_delta\ndata: {\"delta\":\"x\"}\n\n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), &TurnEvent::TextDelta { delta: "x".into() });
    }

    #[test]
    fn error_event_without_message_gets_a_default() {
        let mut decoder = WireDecoder::new();
        let out = decoder.push("event: error\ndata: not json\n\n");
        assert_eq!(
            out[0].as_ref().unwrap(),
            &TurnEvent::Error { error: "agent stream failed".into() }
        );
    }

    #[test]
    fn malformed_ui_payload_is_reported() {
        let mut decoder = WireDecoder::new();
        let out = decoder.push("event: ui\ndata: {\"block\":{\"type\":\"pie\"}}\n\n");
        assert!(matches!(&out[0], Err(WireError::Payload { event, .. }) if event == "ui"));
    }

    #[test]
    fn finish_flushes_unterminated_block() {
        let mut decoder = WireDecoder::new();
        assert!(decoder.push("event: text_delta\ndata: {\"delta\":\"tail\"}").is_empty());
        let last = decoder.finish().unwrap().unwrap();
        assert_eq!(last, TurnEvent::TextDelta { delta: "tail".into() });
    }

    #[test]
    fn merge_actions_appends_missing_kinds_only() {
        let mut out = output();
        out.open_modal_id = Some("docs-quickstart".into());
        let merged = merge_actions(&out);
        assert_eq!(
            merged,
            vec![
                AgentAction::Navigate { to: "/pricing".into() },
                AgentAction::OpenModal { id: "docs-quickstart".into() },
            ]
        );
    }
}
