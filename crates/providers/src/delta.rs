//! Reassembly of streamed tool calls.
//!
//! Backends stream a tool call as a run of fragments keyed by call index.
//! Any fragment may carry any slice of the id, the name or the argument
//! text, including a slice that splits a JSON token.

use pp_domain::stream::StreamEvent;
use pp_domain::tool::ToolCall;

#[derive(Debug, Default)]
struct PendingCall {
    index: usize,
    id: String,
    name: String,
    arguments: String,
}

/// Accumulates [`StreamEvent::ToolCallFragment`]s for one model turn.
#[derive(Debug)]
pub struct ToolCallAssembler {
    started_at_ms: i64,
    /// In first-seen order; looked up by `index`.
    pending: Vec<PendingCall>,
}

impl ToolCallAssembler {
    /// `started_at_ms` seeds ids for calls whose fragments never carried one.
    pub fn new(started_at_ms: i64) -> Self {
        Self { started_at_ms, pending: Vec::new() }
    }

    fn slot(&mut self, index: usize) -> &mut PendingCall {
        let pos = match self.pending.iter().position(|p| p.index == index) {
            Some(pos) => pos,
            None => {
                self.pending.push(PendingCall { index, ..Default::default() });
                self.pending.len() - 1
            }
        };
        &mut self.pending[pos]
    }

    /// Append one fragment.
    pub fn push(
        &mut self,
        index: usize,
        id: Option<&str>,
        name: Option<&str>,
        arguments: Option<&str>,
    ) {
        let call = self.slot(index);
        if let Some(id) = id {
            // Some backends repeat the full id on every fragment.
            if call.id != id {
                call.id.push_str(id);
            }
        }
        if let Some(name) = name {
            call.name.push_str(name);
        }
        if let Some(arguments) = arguments {
            call.arguments.push_str(arguments);
        }
    }

    /// Feed a stream event. Returns `true` if it was a tool-call fragment.
    pub fn push_event(&mut self, event: &StreamEvent) -> bool {
        match event {
            StreamEvent::ToolCallFragment { index, id, name, arguments } => {
                self.push(*index, id.as_deref(), name.as_deref(), arguments.as_deref());
                true
            }
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Finalize the turn's calls in index order.
    ///
    /// Calls without an id get `call_<started_at_ms>_<index>`. Calls whose
    /// name is still empty are discarded.
    pub fn finish(self) -> Vec<ToolCall> {
        let started_at_ms = self.started_at_ms;
        let mut pending = self.pending;
        pending.sort_by_key(|p| p.index);

        pending
            .into_iter()
            .filter_map(|p| {
                if p.name.trim().is_empty() {
                    tracing::debug!(index = p.index, "dropping streamed tool call with no name");
                    return None;
                }
                let call_id = if p.id.is_empty() {
                    format!("call_{started_at_ms}_{}", p.index)
                } else {
                    p.id
                };
                Some(ToolCall { call_id, tool_name: p.name, arguments: p.arguments })
            })
            .collect()
    }
}
