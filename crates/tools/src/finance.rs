//! Finance Data Service client and the two finance tools.
//!
//! `getFinanceOverview` reads `/summary` and `/items` concurrently and
//! derives a daily cumulative assets/liabilities trend from the raw items.
//! `createFinanceItem` posts to `/items`. Non-success responses surface as
//! [`ToolError::Upstream`] with the service's own message.

use std::time::Duration;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use pp_domain::agent::TrendPoint;
use pp_domain::config::FinanceConfig;
use pp_domain::finance::{FinanceItem, FinanceKind, FinanceSummary, NewFinanceItem};

use crate::error::ToolError;

pub const MIN_RANGE_DAYS: u32 = 3;
pub const MAX_RANGE_DAYS: u32 = 30;
pub const DEFAULT_RANGE_DAYS: u32 = 7;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool inputs / outputs
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewArgs {
    #[serde(default)]
    pub range_days: Option<f64>,
}

impl OverviewArgs {
    pub fn range_days(&self) -> Result<u32, ToolError> {
        let Some(days) = self.range_days else {
            return Ok(DEFAULT_RANGE_DAYS);
        };
        if !days.is_finite() || days.fract() != 0.0 {
            return Err(ToolError::invalid("rangeDays must be a whole number"));
        }
        if days < MIN_RANGE_DAYS as f64 || days > MAX_RANGE_DAYS as f64 {
            return Err(ToolError::invalid(format!(
                "rangeDays must be between {MIN_RANGE_DAYS} and {MAX_RANGE_DAYS}"
            )));
        }
        Ok(days as u32)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceOverview {
    pub summary: FinanceSummary,
    pub trend: Vec<TrendPoint>,
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemArgs {
    pub kind: String,
    pub category: String,
    pub amount: Value,
}

impl CreateItemArgs {
    pub fn validate(self) -> Result<NewFinanceItem, ToolError> {
        let kind: FinanceKind = self.kind.parse().map_err(ToolError::InvalidArgument)?;

        let category = self.category.trim();
        if category.is_empty() {
            return Err(ToolError::invalid("category is required"));
        }

        let amount = match &self.amount {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        let amount = amount
            .filter(|a| a.is_finite())
            .ok_or_else(|| ToolError::invalid("amount must be a finite number"))?;

        Ok(NewFinanceItem {
            kind,
            category: category.to_string(),
            amount,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedItem {
    pub item: FinanceItem,
    pub base_url: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
struct ItemsEnvelope {
    #[serde(default)]
    items: Vec<FinanceItem>,
}

#[derive(Deserialize)]
struct ItemEnvelope {
    item: FinanceItem,
}

#[derive(Clone)]
pub struct FinanceClient {
    base_url: String,
    items_limit: u32,
    client: reqwest::Client,
}

impl FinanceClient {
    pub fn from_config(cfg: &FinanceConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()?;
        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            items_limit: cfg.items_limit,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn summary(&self) -> Result<FinanceSummary, ToolError> {
        let resp = self
            .client
            .get(format!("{}/summary", self.base_url))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn items(&self) -> Result<Vec<FinanceItem>, ToolError> {
        let resp = self
            .client
            .get(format!("{}/items", self.base_url))
            .query(&[("limit", self.items_limit)])
            .send()
            .await?;
        let envelope: ItemsEnvelope = check(resp).await?.json().await?;
        Ok(envelope.items)
    }

    pub async fn create_item(&self, item: &NewFinanceItem) -> Result<FinanceItem, ToolError> {
        let resp = self
            .client
            .post(format!("{}/items", self.base_url))
            .json(item)
            .send()
            .await?;
        let envelope: ItemEnvelope = check(resp).await?.json().await?;
        tracing::info!(
            id = envelope.item.id,
            kind = envelope.item.kind.as_str(),
            "finance item created"
        );
        Ok(envelope.item)
    }

    /// Summary plus a trend ending at `today`.
    pub async fn overview(&self, range_days: u32, today: NaiveDate) -> Result<FinanceOverview, ToolError> {
        let (summary, items) = tokio::try_join!(self.summary(), self.items())?;
        Ok(FinanceOverview {
            summary,
            trend: daily_trend(&items, range_days, today),
            base_url: self.base_url.clone(),
        })
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ToolError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    Err(ToolError::Upstream {
        status: status.as_u16(),
        message,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One point per day for the `days` days ending at `today`, each holding
/// the running totals of everything created on or before that day.
/// Items with an unreadable timestamp count from the first day.
pub fn daily_trend(items: &[FinanceItem], days: u32, today: NaiveDate) -> Vec<TrendPoint> {
    let start = today
        .checked_sub_days(Days::new(days.saturating_sub(1) as u64))
        .unwrap_or(today);

    let mut points = Vec::with_capacity(days as usize);
    let mut day = start;
    while day <= today {
        let (mut assets, mut liabilities) = (0.0, 0.0);
        for item in items {
            if item.created_on().map_or(true, |d| d <= day) {
                match item.kind {
                    FinanceKind::Asset => assets += item.amount,
                    FinanceKind::Liability => liabilities += item.amount,
                }
            }
        }
        points.push(TrendPoint {
            label: day.format("%m-%d").to_string(),
            assets,
            liabilities,
        });
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    points
}
