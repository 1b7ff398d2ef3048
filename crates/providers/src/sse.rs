//! Shared SSE streaming infrastructure for the provider adapters.
//!
//! Both adapters follow the same pattern: receive a `reqwest::Response`,
//! buffer chunks, split on blank lines, extract `data:` payloads, and feed
//! each payload to a provider-specific parser that returns
//! `Vec<Result<StreamEvent>>`.

use crate::util::from_reqwest;
use pp_domain::error::Result;
use pp_domain::stream::{BoxStream, StreamEvent};

/// Extract complete `data:` payloads from an SSE buffer.
///
/// Events are delimited by a blank line. Only `data:` lines matter here;
/// multiple `data:` lines in one event are joined with `\n`. `\r\n` line
/// endings are normalized first.
///
/// The buffer is drained in-place; a trailing partial event stays for the
/// next call.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    if buffer.contains('\r') {
        *buffer = buffer.replace("\r\n", "\n");
    }

    let mut payloads = Vec::new();
    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos + 2).collect();
        let data: Vec<&str> = block
            .lines()
            .filter_map(|line| line.trim().strip_prefix("data:"))
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .collect();
        if !data.is_empty() {
            payloads.push(data.join("\n"));
        }
    }
    payloads
}

/// Build a [`BoxStream`] from an SSE `reqwest::Response` and a
/// provider-specific parser closure.
///
/// The closure is `FnMut` so a parser can keep state across payloads
/// (Gemini numbers its function calls that way). The stream flushes any
/// unterminated final event when the body closes and emits a fallback
/// `Done` if the parser never produced one.
pub(crate) fn sse_response_stream<F>(
    response: reqwest::Response,
    mut parse_data: F,
) -> BoxStream<'static, Result<StreamEvent>>
where
    F: FnMut(&str) -> Vec<Result<StreamEvent>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut response = response;
        let mut buffer = String::new();
        let mut done_emitted = false;

        loop {
            let closed = match response.chunk().await {
                Ok(Some(bytes)) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));
                    false
                }
                Ok(None) => {
                    if !buffer.trim().is_empty() {
                        buffer.push_str("\n\n");
                    }
                    true
                }
                Err(e) => {
                    yield Err(from_reqwest(e));
                    break;
                }
            };

            for data in drain_data_lines(&mut buffer) {
                for event in parse_data(&data) {
                    if matches!(&event, Ok(StreamEvent::Done { .. })) {
                        done_emitted = true;
                    }
                    yield event;
                }
            }

            if closed {
                break;
            }
        }

        if !done_emitted {
            yield Ok(StreamEvent::Done {
                usage: None,
                finish_reason: Some("stop".into()),
            });
        }
    };

    Box::pin(stream)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_multiple_events() {
        let mut buf = String::from("event: message\ndata: first\n\ndata: second\n\n");
        assert_eq!(drain_data_lines(&mut buf), vec!["first", "second"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_partial_event_stays_in_buffer() {
        let mut buf = String::from("data: complete\n\ndata: partial");
        assert_eq!(drain_data_lines(&mut buf), vec!["complete"]);
        assert_eq!(buf, "data: partial");

        buf.push_str("\n\n");
        assert_eq!(drain_data_lines(&mut buf), vec!["partial"]);
    }

    #[test]
    fn drain_handles_crlf() {
        let mut buf = String::from("data: {\"a\":1}\r\n\r\ndata: [DONE]\r\n\r\n");
        assert_eq!(drain_data_lines(&mut buf), vec!["{\"a\":1}", "[DONE]"]);
    }

    #[test]
    fn drain_joins_multiline_data() {
        let mut buf = String::from("data: one\ndata: two\n\n");
        assert_eq!(drain_data_lines(&mut buf), vec!["one\ntwo"]);
    }

    #[test]
    fn drain_skips_keepalive_blocks() {
        let mut buf = String::from(": ping\n\ndata: \n\nid: 4\nretry: 10\ndata: x\n\n");
        assert_eq!(drain_data_lines(&mut buf), vec!["x"]);
    }
}
