//! Wire types of the Finance Data Service collaborator.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinanceKind {
    Asset,
    Liability,
}

impl FinanceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FinanceKind::Asset => "asset",
            FinanceKind::Liability => "liability",
        }
    }
}

impl std::str::FromStr for FinanceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asset" => Ok(FinanceKind::Asset),
            "liability" => Ok(FinanceKind::Liability),
            other => Err(format!("unknown finance kind \"{other}\" (expected asset or liability)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceItem {
    pub id: i64,
    pub kind: FinanceKind,
    pub category: String,
    pub amount: f64,
    /// `YYYY-MM-DD HH:MM:SS` in UTC, as the data store writes it.
    pub created_at: String,
}

impl FinanceItem {
    /// Calendar date the item was created, if the timestamp parses.
    pub fn created_on(&self) -> Option<chrono::NaiveDate> {
        let raw = self.created_at.trim();
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .map(|dt| dt.date())
            .or_else(|_| chrono::DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
            .or_else(|_| chrono::NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d"))
            .ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFinanceItem {
    pub kind: FinanceKind,
    pub category: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceTotals {
    pub assets: f64,
    pub liabilities: f64,
    pub net_worth: f64,
}

/// One category row of the dashboard allocation bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRow {
    pub label: String,
    pub amount: f64,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub width: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinanceSummary {
    pub totals: FinanceTotals,
    #[serde(default)]
    pub assets: Vec<AllocationRow>,
    #[serde(default)]
    pub liabilities: Vec<AllocationRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!(" Asset ".parse::<FinanceKind>().unwrap(), FinanceKind::Asset);
        assert!("equity".parse::<FinanceKind>().is_err());
    }

    #[test]
    fn created_on_accepts_store_format() {
        let item: FinanceItem = serde_json::from_value(serde_json::json!({
            "id": 3, "kind": "liability", "category": "Loan",
            "amount": 1200.0, "createdAt": "2026-02-03 10:11:12"
        }))
        .unwrap();
        assert_eq!(
            item.created_on(),
            chrono::NaiveDate::from_ymd_opt(2026, 2, 3)
        );
    }
}
