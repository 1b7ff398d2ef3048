pub mod delta;
pub mod google;
pub mod openai_compat;
pub mod registry;
pub mod traits;
pub(crate) mod sse;
pub mod util;

// Re-exports for convenience.
pub use delta::ToolCallAssembler;
pub use registry::ProviderRegistry;
pub use traits::{ChatRequest, ChatResponse, Generation, LlmProvider, TerminalAnswer};
