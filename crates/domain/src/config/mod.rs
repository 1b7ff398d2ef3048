mod agent;
mod finance;
mod llm;
mod observability;
mod server;
mod sessions;
mod tools;

pub use agent::*;
pub use finance::*;
pub use llm::*;
pub use observability::*;
pub use server::*;
pub use sessions::*;
pub use tools::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub finance: FinanceConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good. Entries with
    /// [`ConfigSeverity::Error`] should abort startup.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }

        if self.agent.max_turns == 0 {
            errors.push(ConfigError::error(
                "agent.max_turns",
                "max_turns must be at least 1",
            ));
        }
        if self.agent.available_routes.is_empty() {
            errors.push(ConfigError::warning(
                "agent.available_routes",
                "no routes allowed; navigation actions will always be dropped",
            ));
        }
        if self.agent.default_timezone.parse::<chrono_tz::Tz>().is_err() {
            errors.push(ConfigError::warning(
                "agent.default_timezone",
                format!("\"{}\" is not a known IANA timezone", self.agent.default_timezone),
            ));
        }

        // One user turn plus one model turn is the smallest useful window.
        if self.sessions.max_history_turns < 2 {
            errors.push(ConfigError::error(
                "sessions.max_history_turns",
                "max_history_turns must be at least 2",
            ));
        }

        if self.finance.base_url.trim().is_empty() {
            errors.push(ConfigError::error(
                "finance.base_url",
                "base_url must not be empty",
            ));
        }
        if !(1..=200).contains(&self.finance.items_limit) {
            errors.push(ConfigError::error(
                "finance.items_limit",
                "items_limit must be between 1 and 200",
            ));
        }

        if self.llm.providers.is_empty() {
            errors.push(ConfigError::warning("llm.providers", "no LLM providers configured"));
        }

        let mut seen = HashSet::new();
        for (i, provider) in self.llm.providers.iter().enumerate() {
            if provider.id.is_empty() {
                errors.push(ConfigError::error(
                    format!("llm.providers[{i}].id"),
                    "provider id must not be empty",
                ));
            } else if !seen.insert(provider.id.as_str()) {
                errors.push(ConfigError::error(
                    format!("llm.providers[{i}].id"),
                    format!("duplicate provider id \"{}\"", provider.id),
                ));
            }
            if provider.base_url.is_empty() {
                errors.push(ConfigError::error(
                    format!("llm.providers[{i}].base_url"),
                    "provider base_url must not be empty",
                ));
            }
        }

        if let Some(default) = &self.llm.default_provider {
            if !self.llm.providers.iter().any(|p| &p.id == default) {
                errors.push(ConfigError::error(
                    "llm.default_provider",
                    format!("\"{default}\" does not match any configured provider id"),
                ));
            }
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            errors.push(ConfigError::warning(
                "llm.temperature",
                "temperature outside 0.0..=2.0 is rejected by most backends",
            ));
        }

        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        errors
    }

    /// True when [`validate`](Self::validate) reports at least one error.
    pub fn has_errors(&self) -> bool {
        self.validate()
            .iter()
            .any(|e| e.severity == ConfigSeverity::Error)
    }
}
