use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session history
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Most-recent turns kept per session. Older turns are evicted first.
    #[serde(default = "d_20")]
    pub max_history_turns: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_history_turns: d_20(),
        }
    }
}

fn d_20() -> usize {
    20
}
