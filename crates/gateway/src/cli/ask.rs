//! `pagepilot ask`: client for a running server's stream endpoint.

use std::io::Write;

use futures_util::StreamExt;

use crate::runtime::{TurnEvent, WireDecoder};

use super::run::print_extras;

pub async fn ask(base_url: &str, session_id: &str, message: &str) -> anyhow::Result<()> {
    let url = format!("{}/api/agent/chat/stream", base_url.trim_end_matches('/'));
    let resp = reqwest::Client::new()
        .post(&url)
        .json(&serde_json::json!({ "sessionId": session_id, "message": message }))
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("connecting to {url}: {e}"))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("server returned {status}: {body}");
    }

    let mut decoder = WireDecoder::new();
    let mut body = resp.bytes_stream();
    // Bytes of a UTF-8 sequence split across chunks.
    let mut pending: Vec<u8> = Vec::new();
    let mut streamed = false;
    let mut finished = false;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| anyhow::anyhow!("reading stream: {e}"))?;
        pending.extend_from_slice(&chunk);
        let valid = match std::str::from_utf8(&pending) {
            Ok(text) => text.len(),
            Err(e) => e.valid_up_to(),
        };
        let text: String = String::from_utf8_lossy(&pending[..valid]).into_owned();
        pending.drain(..valid);

        for event in decoder.push(&text) {
            match event {
                Ok(event) => finished |= render(event, &mut streamed)?,
                Err(e) => tracing::warn!(error = %e, "skipping malformed event"),
            }
        }
    }
    if let Some(Ok(event)) = decoder.finish() {
        finished |= render(event, &mut streamed)?;
    }

    if !finished {
        anyhow::bail!("stream ended before the done event");
    }
    Ok(())
}

/// Print one event. Returns `true` on the terminal `done` event.
fn render(event: TurnEvent, streamed: &mut bool) -> anyhow::Result<bool> {
    match event {
        TurnEvent::TextDelta { delta } => {
            *streamed = true;
            print!("{delta}");
            std::io::stdout().flush().ok();
        }
        TurnEvent::Done { output, history_count, .. } => {
            if *streamed {
                println!();
            } else {
                println!("{}", output.answer);
            }
            print_extras(&output);
            eprintln!("\x1b[2m[history: {history_count}]\x1b[0m");
            return Ok(true);
        }
        TurnEvent::Error { error } => anyhow::bail!(error),
        TurnEvent::MessageStart { .. }
        | TurnEvent::Ui { .. }
        | TurnEvent::Section { .. }
        | TurnEvent::Actions { .. } => {}
    }
    Ok(false)
}
