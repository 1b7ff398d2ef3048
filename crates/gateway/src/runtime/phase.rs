//! Per-exchange stream phase.
//!
//! ```text
//! Start -> StreamingText <-> StreamingTools -> (next turn) -> Finalizing -> Done
//!                      any phase -> Error
//! ```
//!
//! Text fragments are forwarded to the client only while the current turn
//! is in `StreamingText`. Once a tool-call fragment shows up the rest of
//! that turn's text is held back; the next turn starts forwarding again.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Start,
    StreamingText,
    StreamingTools,
    Finalizing,
    Done,
    Error,
}

impl StreamPhase {
    /// A new model turn begins.
    pub fn begin_turn(self) -> Self {
        match self {
            StreamPhase::Start | StreamPhase::StreamingText | StreamPhase::StreamingTools => {
                StreamPhase::StreamingText
            }
            terminal => terminal,
        }
    }

    pub fn on_tool_fragment(self) -> Self {
        match self {
            StreamPhase::Start | StreamPhase::StreamingText | StreamPhase::StreamingTools => {
                StreamPhase::StreamingTools
            }
            terminal => terminal,
        }
    }

    pub fn finalize(self) -> Self {
        match self {
            StreamPhase::Error | StreamPhase::Done => self,
            _ => StreamPhase::Finalizing,
        }
    }

    pub fn done(self) -> Self {
        match self {
            StreamPhase::Finalizing => StreamPhase::Done,
            other => other,
        }
    }

    pub fn fail(self) -> Self {
        StreamPhase::Error
    }

    pub fn forwards_text(self) -> bool {
        self == StreamPhase::StreamingText
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, StreamPhase::Done | StreamPhase::Error)
    }
}
