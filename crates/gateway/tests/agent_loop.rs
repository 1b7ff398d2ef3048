mod common;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use pp_domain::agent::{AgentAction, AgentInput, AgentUiBlock, FALLBACK_ANSWER};
use pp_domain::config::Config;
use pp_domain::tool::{ContentPart, MessageContent, Role};
use pp_gateway::runtime::{run_agent, run_turn, TurnEvent, TurnInput, TurnMode};
use pp_gateway::state::AppState;

use common::{state_with, state_with_config, ScriptedProvider, Step};

fn input(session: &str, message: &str) -> TurnInput {
    TurnInput {
        session_id: session.into(),
        message: message.into(),
        ..TurnInput::default()
    }
}

async fn collect(state: AppState, input: TurnInput, mode: TurnMode) -> Vec<TurnEvent> {
    let mut rx = run_turn(state, input, mode, CancellationToken::new());
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn agent_input(message: &str) -> AgentInput {
    AgentInput {
        message: message.into(),
        history: Vec::new(),
        timezone: "UTC".into(),
        locale: "en-US".into(),
        available_routes: vec!["/".into(), "/pricing".into()],
        available_modals: vec!["docs-quickstart".into()],
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Loop termination
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn five_tool_turns_end_in_fallback_with_deduped_tools() {
    let provider = Arc::new(ScriptedProvider::repeating(Step::tools(&[
        ("calculate", r#"{"expression":"1+1"}"#),
        ("lookupFaq", r#"{"topic":"deploy"}"#),
        ("calculate", r#"{"expression":"2*3"}"#),
    ])));
    let state = state_with(provider.clone());

    for mode in [TurnMode::OneShot, TurnMode::Streaming] {
        let out = run_agent(&state, provider.as_ref(), &agent_input("loop"), mode, None)
            .await
            .unwrap();
        assert_eq!(out.answer, FALLBACK_ANSWER);
        assert_eq!(out.used_tools, vec!["calculate".to_string(), "lookupFaq".to_string()]);
    }
    assert_eq!(provider.call_count(), 10);
}

#[tokio::test]
async fn turn_cap_follows_config() {
    let provider = Arc::new(ScriptedProvider::repeating(Step::tools(&[(
        "getDateTime",
        r#"{"timezone":"UTC"}"#,
    )])));
    let mut config = Config::default();
    config.agent.max_turns = 2;
    let state = state_with_config(provider.clone(), config);

    let out = run_agent(&state, provider.as_ref(), &agent_input("time?"), TurnMode::OneShot, None)
        .await
        .unwrap();
    assert_eq!(out.answer, FALLBACK_ANSWER);
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn empty_response_breaks_early() {
    let provider = Arc::new(ScriptedProvider::new(vec![Step::Empty, Step::text("never")]));
    let state = state_with(provider.clone());

    let out = run_agent(&state, provider.as_ref(), &agent_input("hi"), TurnMode::OneShot, None)
        .await
        .unwrap();
    assert_eq!(out.answer, FALLBACK_ANSWER);
    assert_eq!(provider.call_count(), 1);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool observations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn tool_results(content: &MessageContent) -> Vec<(String, String, bool)> {
    match content {
        MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::ToolResult { tool_name, content, is_error, .. } => {
                    Some((tool_name.clone(), content.clone(), *is_error))
                }
                _ => None,
            })
            .collect(),
        MessageContent::Text(_) => Vec::new(),
    }
}

#[tokio::test]
async fn tool_errors_are_fed_back_and_the_loop_continues() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Step::tools(&[
            ("calculate", r#"{"expression":"process.exit()"}"#),
            ("calculate", "{not json"),
            ("calculate", r#"{"expression":"(2+3)*4"}"#),
        ]),
        Step::text("It is 20."),
    ]));
    let state = state_with(provider.clone());

    let out = run_agent(&state, provider.as_ref(), &agent_input("math"), TurnMode::OneShot, None)
        .await
        .unwrap();
    assert_eq!(out.answer, "It is 20.");
    assert_eq!(out.used_tools, vec!["calculate".to_string()]);

    let seen = provider.seen.lock();
    let second = &seen[1].messages;
    let placeholder = &second[second.len() - 4];
    assert_eq!(placeholder.role, Role::Assistant);
    assert_eq!(placeholder.content.tool_calls().len(), 3);

    let results: Vec<_> = second[second.len() - 3..]
        .iter()
        .flat_map(|m| tool_results(&m.content))
        .collect();
    assert_eq!(results.len(), 3);
    assert!(results[0].2);
    assert!(results[0].1.contains("Expression contains invalid characters."));
    assert!(results[1].2);
    assert!(results[1].1.contains("malformed tool arguments"));
    assert!(!results[2].2);
    assert!(results[2].1.contains("\"result\":20.0"));
}

#[tokio::test]
async fn unknown_tools_become_error_observations() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Step::tools(&[("deleteEverything", "{}")]),
        Step::text("Sorry."),
    ]));
    let state = state_with(provider.clone());

    let out = run_agent(&state, provider.as_ref(), &agent_input("x"), TurnMode::Streaming, None)
        .await
        .unwrap();
    assert_eq!(out.answer, "Sorry.");
    assert_eq!(out.used_tools, vec!["deleteEverything".to_string()]);

    let seen = provider.seen.lock();
    let last = seen[1].messages.last().unwrap();
    let results = tool_results(&last.content);
    assert_eq!(results[0].1, r#"{"error":"unknown tool: deleteEverything"}"#);
}

#[tokio::test]
async fn system_prompt_lists_the_request_allow_list() {
    let provider = Arc::new(ScriptedProvider::new(vec![Step::text("ok")]));
    let state = state_with(provider.clone());

    run_agent(&state, provider.as_ref(), &agent_input("hi"), TurnMode::OneShot, None)
        .await
        .unwrap();
    let seen = provider.seen.lock();
    let system = seen[0].messages[0].content.text().unwrap().to_string();
    assert!(system.contains("Allowed website routes: /, /pricing."));
    assert!(system.contains("Allowed modal ids: docs-quickstart."));
    assert_eq!(seen[0].tools.len(), 5);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Normalization on every path
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn navigate_tag_is_extracted_and_checked() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Step::text("Sure. <<NAVIGATE:/pricing>>"),
        Step::text("Nope <<NAVIGATE:/nope>> <<open_modal:docs-quickstart>>"),
    ]));
    let state = state_with(provider.clone());

    let out = run_agent(&state, provider.as_ref(), &agent_input("go"), TurnMode::OneShot, None)
        .await
        .unwrap();
    assert_eq!(out.answer, "Sure.");
    assert_eq!(out.navigate_to.as_deref(), Some("/pricing"));
    assert_eq!(out.actions, vec![AgentAction::Navigate { to: "/pricing".into() }]);

    let out = run_agent(&state, provider.as_ref(), &agent_input("go"), TurnMode::OneShot, None)
        .await
        .unwrap();
    assert_eq!(out.answer, "Nope");
    assert_eq!(out.navigate_to, None);
    assert_eq!(out.open_modal_id.as_deref(), Some("docs-quickstart"));
    assert_eq!(out.actions, vec![AgentAction::OpenModal { id: "docs-quickstart".into() }]);
}

#[tokio::test]
async fn structured_answers_are_parsed_and_sanitized() {
    let answer = r#"```json
{"answer":"Here you go","usedTools":["getFinanceOverview","bogus"],
 "navigateTo":"//evil.example",
 "actions":[{"type":"navigate","to":"/pricing"}],
 "ui":[{"type":"asset_donut","items":[{"label":"Cash","amount":5},{"label":"Debt","amount":-1}]}]}
```"#;
    let provider = Arc::new(ScriptedProvider::new(vec![Step::text(answer)]).structured());
    let state = state_with(provider.clone());

    let out = run_agent(&state, provider.as_ref(), &agent_input("show"), TurnMode::OneShot, None)
        .await
        .unwrap();
    assert_eq!(out.answer, "Here you go");
    assert_eq!(out.used_tools, vec!["getFinanceOverview".to_string()]);
    assert_eq!(out.navigate_to.as_deref(), Some("/pricing"));
    match &out.ui[..] {
        [AgentUiBlock::AssetDonut { items, .. }] => assert_eq!(items.len(), 1),
        other => panic!("unexpected ui: {other:?}"),
    }
}

#[tokio::test]
async fn structured_backend_falls_back_to_free_text() {
    let provider =
        Arc::new(ScriptedProvider::new(vec![Step::text("plain words")]).structured());
    let state = state_with(provider.clone());

    let out = run_agent(&state, provider.as_ref(), &agent_input("hi"), TurnMode::Streaming, None)
        .await
        .unwrap();
    assert_eq!(out.answer, "plain words");
}

#[tokio::test]
async fn one_shot_and_streaming_backends_agree() {
    let script = || {
        vec![
            Step::tools(&[("lookupFaq", r#"{"topic":"auth"}"#)]),
            Step::text("Auth is handled upstream. <<OPEN_MODAL:docs-quickstart>>"),
        ]
    };
    let a = Arc::new(ScriptedProvider::new(script()));
    let b = Arc::new(ScriptedProvider::new(script()));
    let state = state_with(a.clone());

    let one_shot = run_agent(&state, a.as_ref(), &agent_input("auth?"), TurnMode::OneShot, None)
        .await
        .unwrap();
    let streamed = run_agent(&state, b.as_ref(), &agent_input("auth?"), TurnMode::Streaming, None)
        .await
        .unwrap();
    assert_eq!(one_shot, streamed);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Event sequence
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn streaming_holds_back_text_after_a_tool_fragment() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Step::Tools {
            calls: vec![("calculate".into(), r#"{"expression":"6*7"}"#.into())],
            lead: "Let me check".into(),
            trail: " [partial call text]".into(),
        },
        Step::text("It is 42."),
    ]));
    let state = state_with(provider.clone());

    let events = collect(state.clone(), input("s-stream", "6*7?"), TurnMode::Streaming).await;

    assert_eq!(events.first(), Some(&TurnEvent::MessageStart { session_id: "s-stream".into() }));
    let text: String = events
        .iter()
        .filter_map(|e| match e {
            TurnEvent::TextDelta { delta } => Some(delta.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "Let me checkIt is 42.");

    let n = events.len();
    assert!(matches!(&events[n - 2], TurnEvent::Actions { output, .. } if output.answer == "It is 42."));
    match &events[n - 1] {
        TurnEvent::Done { output, history_count, .. } => {
            assert_eq!(output.used_tools, vec!["calculate".to_string()]);
            assert_eq!(*history_count, 2);
        }
        other => panic!("expected done, got {other:?}"),
    }
}

#[tokio::test]
async fn ui_and_sections_precede_actions_and_done() {
    let answer = r#"{"answer":"Added a section.",
        "ui":[{"type":"finance_trend_line","points":[
            {"label":"03-01","assets":10,"liabilities":2},
            {"label":"03-02","assets":12,"liabilities":2}]}],
        "sections":[{"id":"My Section!","slot":"after-b","blocks":[
            {"type":"asset_donut","items":[{"label":"Cash","amount":5}]}]},
            {"id":"elsewhere","slot":"header","blocks":[
            {"type":"asset_donut","items":[{"label":"Cash","amount":5}]}]}]}"#;
    let provider = Arc::new(ScriptedProvider::new(vec![Step::text(answer)]).structured());
    let state = state_with(provider);

    let events = collect(state, input("s-ui", "add a chart section"), TurnMode::Streaming).await;
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            TurnEvent::MessageStart { .. } => "message_start",
            TurnEvent::TextDelta { .. } => "text_delta",
            TurnEvent::Ui { .. } => "ui",
            TurnEvent::Section { .. } => "section",
            TurnEvent::Actions { .. } => "actions",
            TurnEvent::Done { .. } => "done",
            TurnEvent::Error { .. } => "error",
        })
        .collect();
    // Structured backends stream JSON, which is never forwarded as text.
    assert_eq!(kinds, ["message_start", "ui", "section", "actions", "done"]);

    match &events[2] {
        TurnEvent::Section { section } => {
            assert_eq!(section.id, "my-section");
            assert_eq!(section.blocks.len(), 1);
        }
        other => panic!("expected section, got {other:?}"),
    }
}

#[tokio::test]
async fn model_failure_emits_error_and_records_nothing() {
    let provider = Arc::new(ScriptedProvider::new(vec![Step::Fail("HTTP 500 - boom".into())]));
    let state = state_with(provider);

    let events = collect(state.clone(), input("s-fail", "hi"), TurnMode::Streaming).await;
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], TurnEvent::MessageStart { .. }));
    match &events[1] {
        TurnEvent::Error { error } => assert!(error.contains("boom"), "{error}"),
        other => panic!("expected error, got {other:?}"),
    }
    assert!(state.history.snapshot("s-fail").await.is_empty());
}

#[tokio::test]
async fn missing_provider_is_a_configuration_error() {
    let state = common::state_without_providers();
    let events = collect(state, input("s", "hi"), TurnMode::OneShot).await;
    match &events[..] {
        [TurnEvent::Error { error }] => assert!(error.starts_with("config:"), "{error}"),
        other => panic!("unexpected events: {other:?}"),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// History and cancellation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn history_seeds_the_next_exchange() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Step::text("first answer <<NAVIGATE:/pricing>>"),
        Step::text("second answer"),
    ]));
    let state = state_with(provider.clone());

    collect(state.clone(), input("s-hist", "first"), TurnMode::OneShot).await;
    collect(state.clone(), input("s-hist", "second"), TurnMode::OneShot).await;

    let history = state.history.snapshot("s-hist").await;
    let contents: Vec<&str> = history.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, ["first", "first answer", "second", "second answer"]);

    // system + 2 history turns + user
    let seen = provider.seen.lock();
    assert_eq!(seen[1].messages.len(), 4);
    assert_eq!(seen[1].messages[2].role, Role::Assistant);
    assert_eq!(seen[1].messages[2].content.text(), Some("first answer"));
}

#[tokio::test]
async fn cancelled_turn_records_no_history() {
    let provider = Arc::new(ScriptedProvider::new(vec![Step::Hang]));
    let state = state_with(provider);

    let cancel = CancellationToken::new();
    let mut rx = run_turn(state.clone(), input("s-cancel", "wait"), TurnMode::Streaming, cancel.clone());
    assert!(matches!(rx.recv().await, Some(TurnEvent::MessageStart { .. })));

    cancel.cancel();
    assert_eq!(rx.recv().await, None);
    assert!(state.history.snapshot("s-cancel").await.is_empty());
}
