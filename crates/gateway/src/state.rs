use std::sync::Arc;

use pp_domain::config::Config;
use pp_providers::registry::ProviderRegistry;
use pp_sessions::HistoryStore;
use pp_tools::ToolRegistry;

/// Shared application state passed to all API handlers and turn tasks.
///
/// The history store is the only mutable state shared across requests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm: Arc<ProviderRegistry>,
    pub tools: Arc<ToolRegistry>,
    pub history: Arc<HistoryStore>,
}

impl AppState {
    pub fn new(config: Arc<Config>, llm: ProviderRegistry, tools: ToolRegistry) -> Self {
        let history = HistoryStore::new(config.sessions.max_history_turns);
        Self {
            config,
            llm: Arc::new(llm),
            tools: Arc::new(tools),
            history: Arc::new(history),
        }
    }
}
