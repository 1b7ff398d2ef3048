//! Per-exchange runtime: the orchestration loop, its stream phases, the
//! system prompt and the SSE wire format.

pub mod phase;
pub mod prompt;
pub mod turn;
pub mod wire;

pub use phase::StreamPhase;
pub use turn::{run_agent, run_turn, TurnEvent, TurnInput, TurnMode};
pub use wire::{encode, merge_actions, ChatReply, WireDecoder, WireError};
