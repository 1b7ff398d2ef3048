//! `pagepilot run`: one exchange, in-process.
//!
//! Streams text to stdout as it arrives, then lists the actions, charts
//! and sections the host page would receive.

use std::io::Write;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use pp_domain::agent::AgentOutput;
use pp_domain::config::Config;

use crate::bootstrap;
use crate::runtime::{merge_actions, run_turn, ChatReply, TurnEvent, TurnInput, TurnMode};

pub async fn run(
    config: Arc<Config>,
    message: String,
    session_id: String,
    json_output: bool,
) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(config)?;

    let input = TurnInput {
        session_id,
        message,
        ..TurnInput::default()
    };
    let mode = if json_output { TurnMode::OneShot } else { TurnMode::Streaming };
    let mut rx = run_turn(state, input, mode, CancellationToken::new());

    let mut streamed_text = false;
    while let Some(event) = rx.recv().await {
        match event {
            TurnEvent::TextDelta { delta } if !json_output => {
                streamed_text = true;
                print!("{delta}");
                std::io::stdout().flush().ok();
            }
            TurnEvent::Done { session_id, output, history_count } => {
                if json_output {
                    let reply = ChatReply { session_id, output, history_count: Some(history_count) };
                    println!("{}", serde_json::to_string_pretty(&reply)?);
                } else {
                    if streamed_text {
                        println!();
                    } else {
                        println!("{}", output.answer);
                    }
                    print_extras(&output);
                }
            }
            TurnEvent::Error { error } => anyhow::bail!(error),
            _ => {}
        }
    }

    Ok(())
}

/// Summarize the structured side-effects on stderr.
pub(crate) fn print_extras(output: &AgentOutput) {
    if !output.used_tools.is_empty() {
        eprintln!("\x1b[2m[tools: {}]\x1b[0m", output.used_tools.join(", "));
    }
    for action in merge_actions(output) {
        if let Ok(json) = serde_json::to_string(&action) {
            eprintln!("\x1b[2m[action: {json}]\x1b[0m");
        }
    }
    for block in &output.ui {
        if let Ok(json) = serde_json::to_string(block) {
            eprintln!("\x1b[2m[ui: {json}]\x1b[0m");
        }
    }
    for section in &output.sections {
        eprintln!(
            "\x1b[2m[section: {} ({} block(s))]\x1b[0m",
            section.id,
            section.blocks.len()
        );
    }
}
