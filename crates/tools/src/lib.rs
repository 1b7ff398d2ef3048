//! Built-in tools for pagepilot.
//!
//! The model may call five tools by name: `getDateTime`, `calculate`,
//! `lookupFaq`, `getFinanceOverview` and `createFinanceItem`. The two
//! finance tools talk to the Finance Data Service over HTTP; the rest are
//! local and pure.

pub mod args;
pub mod calculator;
pub mod clock;
pub mod error;
pub mod faq;
pub mod finance;
pub mod registry;

pub use error::ToolError;
pub use finance::FinanceClient;
pub use registry::{ToolName, ToolRegistry};
