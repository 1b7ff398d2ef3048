use pp_domain::agent::{AgentAction, AgentOutput, FALLBACK_ANSWER};
use serde_json::Value;

use crate::routes::{normalize_modal_id, normalize_route, AllowList};
use crate::sections::normalize_sections;
use crate::tags;
use crate::ui::normalize_blocks;

/// Untrusted terminal output of a model, before sanitization.
///
/// Structured fields stay as raw JSON so that one malformed element only
/// costs that element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOutput {
    pub answer: String,
    pub used_tools: Vec<String>,
    pub actions: Vec<Value>,
    pub ui: Vec<Value>,
    pub sections: Vec<Value>,
    pub navigate_to: Option<String>,
    pub open_modal_id: Option<String>,
}

fn array_field(obj: &serde_json::Map<String, Value>, key: &str) -> Vec<Value> {
    obj.get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn string_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

impl RawOutput {
    /// Free-text answer with no structured fields.
    pub fn text(answer: impl Into<String>, used_tools: Vec<String>) -> Self {
        Self { answer: answer.into(), used_tools, ..Default::default() }
    }

    /// Read an AgentOutput-shaped JSON object. Returns `None` unless the
    /// value is an object with a string `answer`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let answer = obj.get("answer")?.as_str()?.to_string();
        let used_tools = obj
            .get("usedTools")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        Some(Self {
            answer,
            used_tools,
            actions: array_field(obj, "actions"),
            ui: array_field(obj, "ui"),
            sections: array_field(obj, "sections"),
            navigate_to: string_field(obj, "navigateTo"),
            open_modal_id: string_field(obj, "openModalId"),
        })
    }

    /// Parse a terminal message that may be a structured JSON object,
    /// optionally wrapped in a fenced code block.
    pub fn from_structured_text(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let body = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .and_then(|rest| rest.trim_end().strip_suffix("```"))
            .unwrap_or(trimmed)
            .trim();
        if !body.starts_with('{') {
            return None;
        }
        let value: Value = serde_json::from_str(body).ok()?;
        Self::from_value(&value)
    }

    /// Re-enter an already normalized output.
    pub fn from_output(out: &AgentOutput) -> Self {
        Self {
            answer: out.answer.clone(),
            used_tools: out.used_tools.clone(),
            actions: out.actions.iter().filter_map(|a| serde_json::to_value(a).ok()).collect(),
            ui: out.ui.iter().filter_map(|b| serde_json::to_value(b).ok()).collect(),
            sections: out.sections.iter().filter_map(|s| serde_json::to_value(s).ok()).collect(),
            navigate_to: out.navigate_to.clone(),
            open_modal_id: out.open_modal_id.clone(),
        }
    }
}

fn push_unique(out: &mut Vec<String>, v: String) {
    if !out.contains(&v) {
        out.push(v);
    }
}

/// Sanitize a model's terminal output into an [`AgentOutput`].
///
/// This is the only path by which model text becomes navigation or UI
/// state. Disallowed or malformed values are dropped silently. Targets are
/// taken from the top-level fields first, then structured actions, then
/// inline tags, keeping first occurrences. `issued_at_ms` seeds ids for
/// sections whose own id normalizes to nothing.
pub fn finalize(raw: RawOutput, allow: &AllowList, issued_at_ms: i64) -> AgentOutput {
    let parsed = tags::extract(&raw.answer);

    let mut route_candidates: Vec<String> = Vec::new();
    let mut modal_candidates: Vec<String> = Vec::new();

    route_candidates.extend(raw.navigate_to.as_deref().and_then(normalize_route));
    modal_candidates.extend(raw.open_modal_id.as_deref().and_then(normalize_modal_id));

    for action in &raw.actions {
        match action.get("type").and_then(Value::as_str) {
            Some("navigate") => route_candidates
                .extend(action.get("to").and_then(Value::as_str).and_then(normalize_route)),
            Some("open_modal") => modal_candidates
                .extend(action.get("id").and_then(Value::as_str).and_then(normalize_modal_id)),
            _ => {}
        }
    }

    route_candidates.extend(parsed.routes);
    modal_candidates.extend(parsed.modal_ids);

    let mut routes = Vec::new();
    for r in route_candidates.into_iter().filter(|r| allow.allows_route(r)) {
        push_unique(&mut routes, r);
    }
    let mut modals = Vec::new();
    for m in modal_candidates.into_iter().filter(|m| allow.allows_modal(m)) {
        push_unique(&mut modals, m);
    }

    let mut used_tools = Vec::new();
    for t in raw.used_tools {
        push_unique(&mut used_tools, t);
    }

    let ui = normalize_blocks(&raw.ui);
    let sections = normalize_sections(&raw.sections, issued_at_ms);

    tracing::debug!(
        routes = routes.len(),
        modals = modals.len(),
        ui_in = raw.ui.len(),
        ui_out = ui.len(),
        sections_in = raw.sections.len(),
        sections_out = sections.len(),
        "agent output finalized"
    );

    let navigate_to = routes.first().cloned();
    let open_modal_id = modals.first().cloned();
    let actions = routes
        .into_iter()
        .map(|to| AgentAction::Navigate { to })
        .chain(modals.into_iter().map(|id| AgentAction::OpenModal { id }))
        .collect();

    let answer = if parsed.answer.is_empty() {
        FALLBACK_ANSWER.to_string()
    } else {
        parsed.answer
    };

    AgentOutput {
        answer,
        used_tools,
        actions,
        ui,
        sections,
        navigate_to,
        open_modal_id,
    }
}
