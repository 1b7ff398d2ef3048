use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider system
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider id used for chat. When unset, the first provider that
    /// initializes successfully wins.
    #[serde(default)]
    pub default_provider: Option<String>,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    #[serde(default = "d_120000u")]
    pub timeout_ms: u64,
    /// Registered model backends. Adding a backend is adding config.
    #[serde(default = "d_providers")]
    pub providers: Vec<ProviderConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_provider: None,
            temperature: d_temperature(),
            timeout_ms: d_120000u(),
            providers: d_providers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub default_model: Option<String>,
    /// Ask the backend for an AgentOutput-shaped JSON object as the
    /// terminal message instead of free text.
    #[serde(default)]
    pub structured_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenaiCompat,
    Google,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Header name (e.g. "Authorization", "x-goog-api-key").
    #[serde(default)]
    pub header: Option<String>,
    /// Header value prefix (e.g. "Bearer ").
    #[serde(default)]
    pub prefix: Option<String>,
    /// Env var containing the key.
    #[serde(default)]
    pub env: Option<String>,
    /// Env vars tried in order when `env` is unset or empty.
    #[serde(default)]
    pub fallback_env: Vec<String>,
    /// Direct key (for config-only setups; prefer env).
    #[serde(default)]
    pub key: Option<String>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_temperature() -> f32 {
    0.2
}
fn d_120000u() -> u64 {
    120_000
}

fn d_providers() -> Vec<ProviderConfig> {
    let openai_model = std::env::var("OPENAI_MODEL")
        .ok()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| "gpt-4.1-mini".into());

    vec![
        ProviderConfig {
            id: "openai".into(),
            kind: ProviderKind::OpenaiCompat,
            base_url: "https://api.openai.com/v1".into(),
            auth: AuthConfig {
                env: Some("OPENAI_API_KEY".into()),
                ..AuthConfig::default()
            },
            default_model: Some(openai_model),
            structured_output: false,
        },
        ProviderConfig {
            id: "gemini".into(),
            kind: ProviderKind::Google,
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            auth: AuthConfig {
                env: Some("GEMINI_API_KEY".into()),
                fallback_env: vec!["GOOGLE_GENAI_API_KEY".into()],
                ..AuthConfig::default()
            },
            default_model: Some("gemini-2.5-flash".into()),
            structured_output: true,
        },
    ]
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
