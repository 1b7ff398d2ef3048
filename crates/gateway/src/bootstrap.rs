//! AppState construction shared by `serve` and `run`.

use std::sync::Arc;

use anyhow::Context;

use pp_domain::config::{Config, ConfigSeverity};
use pp_providers::registry::ProviderRegistry;
use pp_tools::ToolRegistry;

use crate::state::AppState;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
///
/// A missing API key is not fatal here: the server still starts and each
/// chat request reports the configuration problem.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let error_count = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }

    // ── LLM providers ────────────────────────────────────────────────
    let llm = ProviderRegistry::from_config(&config.llm);
    if llm.is_empty() {
        tracing::warn!(
            failed = llm.init_errors().len(),
            "no LLM provider available; chat requests will fail until an API key is set"
        );
    } else {
        tracing::info!(providers = ?llm.list_providers(), "LLM providers ready");
    }

    // ── Tools ────────────────────────────────────────────────────────
    let tools = ToolRegistry::from_config(&config).context("initializing tool registry")?;
    tracing::info!(finance_url = %config.finance.base_url, "tool registry ready");

    Ok(AppState::new(config, llm, tools))
}
