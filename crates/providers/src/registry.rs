//! Provider registry.
//!
//! Constructs and holds the configured LLM provider instances. At startup the
//! registry reads the [`LlmConfig`], resolves API keys from the environment,
//! and instantiates the adapter matching each provider's `kind`.

use std::sync::Arc;
use std::time::Duration;

use crate::google::GoogleProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;
use pp_domain::config::{LlmConfig, ProviderKind};
use pp_domain::error::{Error, Result};

const NO_PROVIDER: &str =
    "no LLM provider is configured: set OPENAI_API_KEY or GEMINI_API_KEY / GOOGLE_GENAI_API_KEY";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ProviderRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Holds the instantiated LLM providers in configuration order.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn LlmProvider>>,
    default_id: Option<String>,
    init_errors: Vec<(String, String)>,
}

impl ProviderRegistry {
    /// Build the registry from the application's [`LlmConfig`].
    ///
    /// Providers that fail to initialize (usually a missing API key) are
    /// logged and skipped rather than aborting startup. The failure surfaces
    /// later, per request, through [`ProviderRegistry::default_provider`].
    pub fn from_config(config: &LlmConfig) -> Self {
        let timeout = Duration::from_millis(config.timeout_ms);
        let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();
        let mut init_errors = Vec::new();

        for pc in &config.providers {
            let result: Result<Arc<dyn LlmProvider>> = match pc.kind {
                ProviderKind::OpenaiCompat => OpenAiCompatProvider::from_config(pc, timeout)
                    .map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
                ProviderKind::Google => GoogleProvider::from_config(pc, timeout)
                    .map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
            };

            match result {
                Ok(provider) => {
                    tracing::info!(provider_id = %pc.id, kind = ?pc.kind, "registered LLM provider");
                    providers.push(provider);
                }
                Err(e) => {
                    tracing::warn!(
                        provider_id = %pc.id,
                        error = %e,
                        "failed to initialize LLM provider, skipping"
                    );
                    init_errors.push((pc.id.clone(), e.to_string()));
                }
            }
        }

        Self {
            providers,
            default_id: config.default_provider.clone(),
            init_errors,
        }
    }

    /// Build a registry around already-constructed providers. The first
    /// one is the default.
    pub fn from_providers(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self {
            providers,
            default_id: None,
            init_errors: Vec::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers
            .iter()
            .find(|p| p.provider_id() == id)
            .cloned()
    }

    /// The provider used for agent turns.
    ///
    /// The configured `default_provider` wins when it initialized; otherwise
    /// the first provider that did. With none available this is an
    /// [`Error::Config`].
    pub fn default_provider(&self) -> Result<Arc<dyn LlmProvider>> {
        if let Some(id) = self.default_id.as_deref() {
            if let Some(p) = self.get(id) {
                return Ok(p);
            }
            tracing::warn!(provider_id = %id, "default provider unavailable, falling back");
        }
        self.providers
            .first()
            .cloned()
            .ok_or_else(|| Error::Config(NO_PROVIDER.into()))
    }

    pub fn list_providers(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.provider_id().to_string()).collect()
    }

    /// `(provider id, error)` for each provider that failed to initialize.
    pub fn init_errors(&self) -> &[(String, String)] {
        &self.init_errors
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use pp_domain::config::{AuthConfig, ProviderConfig};

    fn provider_cfg(id: &str, kind: ProviderKind, key: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            id: id.into(),
            kind,
            base_url: "http://localhost:1".into(),
            auth: AuthConfig {
                env: Some(format!("PP_TEST_UNSET_{}", id.to_uppercase())),
                key: key.map(String::from),
                ..Default::default()
            },
            default_model: None,
            structured_output: false,
        }
    }

    #[test]
    fn missing_keys_leave_registry_empty() {
        let config = LlmConfig {
            providers: vec![provider_cfg("openai", ProviderKind::OpenaiCompat, None)],
            ..Default::default()
        };
        let reg = ProviderRegistry::from_config(&config);
        assert!(reg.is_empty());
        assert_eq!(reg.init_errors().len(), 1);

        let err = reg.default_provider().err().unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn configured_default_wins() {
        let config = LlmConfig {
            default_provider: Some("gemini".into()),
            providers: vec![
                provider_cfg("openai", ProviderKind::OpenaiCompat, Some("k")),
                provider_cfg("gemini", ProviderKind::Google, Some("k")),
            ],
            ..Default::default()
        };
        let reg = ProviderRegistry::from_config(&config);
        assert_eq!(reg.list_providers(), vec!["openai", "gemini"]);
        assert_eq!(reg.default_provider().unwrap().provider_id(), "gemini");
    }

    #[test]
    fn first_provider_is_fallback_default() {
        let config = LlmConfig {
            default_provider: Some("gemini".into()),
            providers: vec![
                provider_cfg("openai", ProviderKind::OpenaiCompat, Some("k")),
                provider_cfg("gemini", ProviderKind::Google, None),
            ],
            ..Default::default()
        };
        let reg = ProviderRegistry::from_config(&config);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.default_provider().unwrap().provider_id(), "openai");
    }
}
