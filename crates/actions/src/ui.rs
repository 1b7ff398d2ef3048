use pp_domain::agent::{AgentUiBlock, DonutSlice, TrendPoint};
use serde_json::Value;

pub const MAX_DONUT_ITEMS: usize = 12;
pub const MAX_TREND_POINTS: usize = 60;
pub const MIN_TREND_POINTS: usize = 2;
pub const MAX_LABEL_CHARS: usize = 40;
pub const MAX_TITLE_CHARS: usize = 80;

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].trim_end().to_string(),
        None => s.to_string(),
    }
}

/// Trimmed, non-empty, at most 40 characters.
pub fn normalize_label(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(truncate_chars(trimmed, MAX_LABEL_CHARS))
}

/// Trimmed, non-empty, at most 80 characters.
pub fn normalize_title(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(truncate_chars(trimmed, MAX_TITLE_CHARS))
}

/// A finite, non-negative JSON number. Numeric strings do not count.
fn amount(v: Option<&Value>) -> Option<f64> {
    let n = v?.as_f64()?;
    (n.is_finite() && n >= 0.0).then_some(n)
}

fn label(v: Option<&Value>) -> Option<String> {
    normalize_label(v?.as_str()?)
}

fn title(block: &Value) -> Option<String> {
    normalize_title(block.get("title").and_then(Value::as_str))
}

fn elements<'a>(block: &'a Value, key: &str) -> &'a [Value] {
    block
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Filter a single model-emitted chart block.
///
/// Invalid items are dropped one by one; the block itself is dropped when
/// nothing usable remains (or a trend line keeps fewer than two points).
pub fn normalize_block(raw: &Value) -> Option<AgentUiBlock> {
    match raw.get("type").and_then(Value::as_str)? {
        "asset_donut" => {
            let items: Vec<DonutSlice> = elements(raw, "items")
                .iter()
                .filter_map(|item| {
                    Some(DonutSlice {
                        label: label(item.get("label"))?,
                        amount: amount(item.get("amount"))?,
                    })
                })
                .take(MAX_DONUT_ITEMS)
                .collect();
            if items.is_empty() {
                return None;
            }
            Some(AgentUiBlock::AssetDonut { title: title(raw), items })
        }
        "finance_trend_line" => {
            let points: Vec<TrendPoint> = elements(raw, "points")
                .iter()
                .filter_map(|point| {
                    Some(TrendPoint {
                        label: label(point.get("label"))?,
                        assets: amount(point.get("assets"))?,
                        liabilities: amount(point.get("liabilities"))?,
                    })
                })
                .take(MAX_TREND_POINTS)
                .collect();
            if points.len() < MIN_TREND_POINTS {
                return None;
            }
            Some(AgentUiBlock::FinanceTrendLine { title: title(raw), points })
        }
        _ => None,
    }
}

pub fn normalize_blocks(raw: &[Value]) -> Vec<AgentUiBlock> {
    raw.iter().filter_map(normalize_block).collect()
}
