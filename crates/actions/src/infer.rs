//! Keyword-driven chart inference.
//!
//! Runs only when the model returned no `ui` blocks of its own but did
//! fetch the finance overview. Its output is raw and still goes through
//! [`finalize`](crate::finalize).

use serde_json::{json, Value};

const DISTRIBUTION_KEYWORDS: &[&str] = &[
    "分布", "分佈", "配置", "比例", "佔比", "distribution", "breakdown", "allocation", "donut", "pie",
];
const TREND_KEYWORDS: &[&str] = &["趨勢", "走勢", "變化", "trend", "over time", "history"];
const CHART_KEYWORDS: &[&str] = &["圖表", "視覺化", "chart", "graph", "visuali"];

fn mentions(haystacks: &[&str], keywords: &[&str]) -> bool {
    haystacks.iter().any(|h| {
        let lower = h.to_lowercase();
        keywords.iter().any(|k| lower.contains(k))
    })
}

/// What kinds of chart the user or the answer asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChartIntent {
    pub distribution: bool,
    pub trend: bool,
}

impl ChartIntent {
    pub fn detect(message: &str, answer: &str) -> Self {
        let texts = [message, answer];
        let distribution = mentions(&texts, DISTRIBUTION_KEYWORDS);
        let trend = mentions(&texts, TREND_KEYWORDS);
        if !distribution && !trend && mentions(&texts, CHART_KEYWORDS) {
            return Self { distribution: true, trend: true };
        }
        Self { distribution, trend }
    }

    pub fn any(self) -> bool {
        self.distribution || self.trend
    }
}

/// Build raw chart blocks from a `getFinanceOverview` result
/// (`{summary: {assets: [{label, amount}]}, trend: [{label, assets, liabilities}]}`).
pub fn infer_blocks(intent: ChartIntent, overview: &Value) -> Vec<Value> {
    let mut blocks = Vec::new();

    if intent.distribution {
        let items: Vec<Value> = overview
            .pointer("/summary/assets")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .map(|r| json!({ "label": r.get("label"), "amount": r.get("amount") }))
                    .collect()
            })
            .unwrap_or_default();
        if !items.is_empty() {
            blocks.push(json!({ "type": "asset_donut", "title": "資產分布", "items": items }));
        }
    }

    if intent.trend {
        if let Some(points) = overview.get("trend").and_then(Value::as_array) {
            if !points.is_empty() {
                blocks.push(json!({
                    "type": "finance_trend_line",
                    "title": "資產負債趨勢",
                    "points": points,
                }));
            }
        }
    }

    blocks
}
