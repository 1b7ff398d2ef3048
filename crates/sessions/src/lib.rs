//! Session history for pagepilot.
//!
//! Each session id owns a bounded transcript of [`ChatTurn`]s that seeds
//! the next exchange. The store lives in memory only.
//!
//! [`ChatTurn`]: pp_domain::agent::ChatTurn

pub mod history;

pub use history::{HistoryStore, SessionHistory};
