//! Tool registry: the catalog the model sees and the dispatcher that runs
//! a requested call.

use std::str::FromStr;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use pp_domain::config::Config;
use pp_domain::tool::ToolDefinition;

use crate::args;
use crate::calculator;
use crate::clock;
use crate::error::ToolError;
use crate::faq;
use crate::finance::{FinanceClient, MAX_RANGE_DAYS, MIN_RANGE_DAYS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    GetDateTime,
    Calculate,
    LookupFaq,
    GetFinanceOverview,
    CreateFinanceItem,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::GetDateTime,
        ToolName::Calculate,
        ToolName::LookupFaq,
        ToolName::GetFinanceOverview,
        ToolName::CreateFinanceItem,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::GetDateTime => "getDateTime",
            ToolName::Calculate => "calculate",
            ToolName::LookupFaq => "lookupFaq",
            ToolName::GetFinanceOverview => "getFinanceOverview",
            ToolName::CreateFinanceItem => "createFinanceItem",
        }
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ToolRegistry {
    finance: FinanceClient,
    default_timezone: String,
    default_locale: String,
    lenient_arguments: bool,
}

impl ToolRegistry {
    pub fn new(
        finance: FinanceClient,
        default_timezone: impl Into<String>,
        default_locale: impl Into<String>,
        lenient_arguments: bool,
    ) -> Self {
        Self {
            finance,
            default_timezone: default_timezone.into(),
            default_locale: default_locale.into(),
            lenient_arguments,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ToolError> {
        Ok(Self::new(
            FinanceClient::from_config(&config.finance)?,
            config.agent.default_timezone.clone(),
            config.agent.default_locale.clone(),
            config.tools.lenient_arguments,
        ))
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        ToolName::ALL.into_iter().map(definition).collect()
    }

    /// Run one tool call. `raw_arguments` is the model's argument text as
    /// received; decoding and validation failures come back as errors like
    /// any other tool failure.
    pub async fn execute(&self, name: &str, raw_arguments: &str) -> Result<Value, ToolError> {
        let tool: ToolName = name.parse()?;
        let args = args::decode(raw_arguments, self.lenient_arguments)?;
        tracing::debug!(tool = name, "executing tool");

        match tool {
            ToolName::GetDateTime => to_value(clock::get_date_time(
                args::typed(name, args)?,
                Utc::now(),
                &self.default_timezone,
                &self.default_locale,
            )?),
            ToolName::Calculate => to_value(calculator::calculate(args::typed(name, args)?)?),
            ToolName::LookupFaq => to_value(faq::lookup(args::typed(name, args)?)),
            ToolName::GetFinanceOverview => {
                let input: crate::finance::OverviewArgs = args::typed(name, args)?;
                let days = input.range_days()?;
                to_value(self.finance.overview(days, Utc::now().date_naive()).await?)
            }
            ToolName::CreateFinanceItem => {
                let input: crate::finance::CreateItemArgs = args::typed(name, args)?;
                let item = self.finance.create_item(&input.validate()?).await?;
                to_value(crate::finance::CreatedItem {
                    item,
                    base_url: self.finance.base_url().to_string(),
                })
            }
        }
    }
}

fn to_value<T: Serialize>(v: T) -> Result<Value, ToolError> {
    serde_json::to_value(v).map_err(|e| ToolError::invalid(format!("unserializable tool result: {e}")))
}

fn definition(tool: ToolName) -> ToolDefinition {
    let (description, parameters) = match tool {
        ToolName::GetDateTime => (
            "Get the current date and time for a timezone.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "timezone": { "type": "string", "description": "IANA timezone, e.g. Asia/Taipei" },
                    "locale": { "type": "string", "description": "BCP 47 locale, e.g. zh-TW" }
                }
            }),
        ),
        ToolName::Calculate => (
            "Calculate a math expression. Supports numbers, (), + - * / % and spaces.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "expression": { "type": "string" }
                },
                "required": ["expression"]
            }),
        ),
        ToolName::LookupFaq => (
            "Lookup known project FAQ entries for setup or architecture questions.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "topic": { "type": "string" }
                },
                "required": ["topic"]
            }),
        ),
        ToolName::GetFinanceOverview => (
            "Get finance summary and recent asset/liability trend points. Use for chart, distribution, trend, breakdown questions.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "rangeDays": {
                        "type": "integer",
                        "minimum": MIN_RANGE_DAYS,
                        "maximum": MAX_RANGE_DAYS,
                        "description": "Trend window in days (default 7)"
                    }
                }
            }),
        ),
        ToolName::CreateFinanceItem => (
            "Create a finance item in the website data store. Use when user asks to add asset/liability data.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "kind": { "type": "string", "enum": ["asset", "liability"] },
                    "category": { "type": "string" },
                    "amount": { "type": "number" }
                },
                "required": ["kind", "category", "amount"]
            }),
        ),
    };

    ToolDefinition {
        name: tool.as_str().into(),
        description: description.into(),
        parameters,
    }
}
