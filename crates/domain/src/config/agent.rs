use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard cap on model turns per exchange.
    #[serde(default = "d_5")]
    pub max_turns: u32,
    #[serde(default = "d_timezone")]
    pub default_timezone: String,
    #[serde(default = "d_locale")]
    pub default_locale: String,
    /// Routes used when a request supplies none.
    #[serde(default = "d_routes")]
    pub available_routes: Vec<String>,
    /// Modal ids used when a request supplies none.
    #[serde(default = "d_modals")]
    pub available_modals: Vec<String>,
    /// Keyword-driven chart inference after the finance overview tool ran.
    #[serde(default = "d_true")]
    pub infer_ui: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: d_5(),
            default_timezone: d_timezone(),
            default_locale: d_locale(),
            available_routes: d_routes(),
            available_modals: d_modals(),
            infer_ui: d_true(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_5() -> u32 {
    5
}
fn d_timezone() -> String {
    "Asia/Taipei".into()
}
fn d_locale() -> String {
    "zh-TW".into()
}
fn d_routes() -> Vec<String> {
    ["/", "/pricing", "/docs", "/support"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn d_modals() -> Vec<String> {
    ["pricing-comparison", "docs-quickstart", "support-contact"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn d_true() -> bool {
    true
}
