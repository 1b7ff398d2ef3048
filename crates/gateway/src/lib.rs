//! pagepilot gateway: the orchestration loop, the SSE protocol adapter,
//! the HTTP API and the CLI.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;
