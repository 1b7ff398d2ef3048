//! Agent contract: the request/response shapes every model backend must
//! ultimately satisfy, independent of how the backend talks to its model.

use serde::{Deserialize, Serialize};

/// Answer substituted whenever no visible text survives.
pub const FALLBACK_ANSWER: &str = "目前沒有可用回覆，請再試一次。";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// History
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One remembered turn of a session transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
    pub fn model(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Model, content: content.into() }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Input
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything one exchange needs. Built per request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInput {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    pub timezone: String,
    pub locale: String,
    pub available_routes: Vec<String>,
    pub available_modals: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Output
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentAction {
    Navigate { to: String },
    OpenModal { id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonutSlice {
    pub label: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub label: String,
    pub assets: f64,
    pub liabilities: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentUiBlock {
    AssetDonut {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        items: Vec<DonutSlice>,
    },
    FinanceTrendLine {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        points: Vec<TrendPoint>,
    },
}

/// The only page slot a model-created section may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionSlot {
    #[serde(rename = "after-b")]
    AfterB,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionMode {
    #[default]
    Ephemeral,
}

/// A transient UI region rendered by the host and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSection {
    pub id: String,
    pub slot: SectionSlot,
    #[serde(default)]
    pub mode: SectionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub blocks: Vec<AgentUiBlock>,
}

/// Normalized result of one exchange.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutput {
    pub answer: String,
    #[serde(default)]
    pub used_tools: Vec<String>,
    #[serde(default)]
    pub actions: Vec<AgentAction>,
    #[serde(default)]
    pub ui: Vec<AgentUiBlock>,
    #[serde(default)]
    pub sections: Vec<AgentSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigate_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_modal_id: Option<String>,
}

/// JSON Schema of [`AgentOutput`], handed to backends that can be asked for
/// a structured terminal message.
pub fn agent_output_schema() -> serde_json::Value {
    let block = serde_json::json!({
        "type": "object",
        "properties": {
            "type": { "type": "string", "enum": ["asset_donut", "finance_trend_line"] },
            "title": { "type": "string" },
            "items": {
                "type": "array",
                "maxItems": 12,
                "items": {
                    "type": "object",
                    "properties": {
                        "label": { "type": "string" },
                        "amount": { "type": "number", "minimum": 0 }
                    },
                    "required": ["label", "amount"]
                }
            },
            "points": {
                "type": "array",
                "minItems": 2,
                "maxItems": 60,
                "items": {
                    "type": "object",
                    "properties": {
                        "label": { "type": "string" },
                        "assets": { "type": "number", "minimum": 0 },
                        "liabilities": { "type": "number", "minimum": 0 }
                    },
                    "required": ["label", "assets", "liabilities"]
                }
            }
        },
        "required": ["type"]
    });

    serde_json::json!({
        "type": "object",
        "properties": {
            "answer": { "type": "string" },
            "usedTools": { "type": "array", "items": { "type": "string" } },
            "actions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "type": { "type": "string", "enum": ["navigate", "open_modal"] },
                        "to": { "type": "string" },
                        "id": { "type": "string" }
                    },
                    "required": ["type"]
                }
            },
            "ui": { "type": "array", "items": block.clone() },
            "sections": {
                "type": "array",
                "maxItems": 3,
                "items": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "slot": { "type": "string", "enum": ["after-b"] },
                        "mode": { "type": "string", "enum": ["ephemeral"] },
                        "title": { "type": "string" },
                        "blocks": { "type": "array", "minItems": 1, "maxItems": 6, "items": block }
                    },
                    "required": ["id", "slot", "blocks"]
                }
            },
            "navigateTo": { "type": "string" },
            "openModalId": { "type": "string" }
        },
        "required": ["answer"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_wire_shape() {
        let nav = serde_json::to_value(AgentAction::Navigate { to: "/docs".into() }).unwrap();
        assert_eq!(nav, serde_json::json!({ "type": "navigate", "to": "/docs" }));
        let modal: AgentAction =
            serde_json::from_value(serde_json::json!({ "type": "open_modal", "id": "m" })).unwrap();
        assert_eq!(modal, AgentAction::OpenModal { id: "m".into() });
    }

    #[test]
    fn output_omits_absent_targets() {
        let out = AgentOutput { answer: "hi".into(), ..Default::default() };
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("navigateTo").is_none());
        assert!(json.get("openModalId").is_none());
        assert_eq!(json["usedTools"], serde_json::json!([]));
    }

    #[test]
    fn section_slot_is_fixed() {
        let bad = serde_json::json!({
            "id": "x", "slot": "header", "blocks": []
        });
        assert!(serde_json::from_value::<AgentSection>(bad).is_err());
        let ok = serde_json::json!({ "id": "x", "slot": "after-b", "blocks": [] });
        let section: AgentSection = serde_json::from_value(ok).unwrap();
        assert_eq!(section.mode, SectionMode::Ephemeral);
    }
}
