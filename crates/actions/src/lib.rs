//! Sanitization boundary between model output and host UI state.
//!
//! Nothing in this crate performs I/O. Given identical inputs (including
//! the `issued_at_ms` stamp used for synthesized section ids) every
//! function returns identical output.

pub mod finalize;
pub mod infer;
pub mod routes;
pub mod sections;
pub mod tags;
pub mod ui;

pub use finalize::{finalize, RawOutput};
pub use routes::AllowList;
