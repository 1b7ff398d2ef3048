use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Finance Data Service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinanceConfig {
    /// Base URL of the finance REST API (`/items`, `/summary` are appended).
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_10000u")]
    pub timeout_ms: u64,
    /// `limit` sent with `GET /items` when building the overview trend.
    #[serde(default = "d_200")]
    pub items_limit: u32,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            timeout_ms: d_10000u(),
            items_limit: d_200(),
        }
    }
}

fn d_base_url() -> String {
    "http://localhost:3000/api/data".into()
}
fn d_10000u() -> u64 {
    10_000
}
fn d_200() -> u32 {
    200
}
