//! `lookupFaq`: fixed project FAQ table.

use serde::{Deserialize, Serialize};

const SOURCE: &str = "local-faq";

const ENTRIES: &[(&str, &str)] = &[
    (
        "tech stack",
        "Backend is a Rust workspace: axum for HTTP, tokio for async, reqwest for model and data calls.",
    ),
    (
        "deploy",
        "Build the release binary or a container image and deploy to Cloud Run, Render, Fly.io, or Railway.",
    ),
    (
        "auth",
        "Start with API key auth at edge and move to OAuth/JWT for user-level access.",
    ),
];

#[derive(Debug, Deserialize)]
pub struct FaqArgs {
    pub topic: String,
}

#[derive(Debug, Serialize)]
pub struct FaqAnswer {
    pub topic: String,
    pub answer: String,
    pub source: &'static str,
}

/// Exact (case-insensitive, trimmed) topic match.
pub fn lookup(args: FaqArgs) -> FaqAnswer {
    let key = args.topic.trim().to_lowercase();
    let answer = ENTRIES
        .iter()
        .find(|(topic, _)| *topic == key)
        .map(|(_, answer)| *answer)
        .unwrap_or("No exact FAQ hit. Ask more specific keywords.");

    FaqAnswer {
        topic: args.topic,
        answer: answer.to_string(),
        source: SOURCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_match_ignores_case_and_padding() {
        let hit = lookup(FaqArgs { topic: "  Deploy ".into() });
        assert!(hit.answer.contains("Cloud Run"));
        assert_eq!(hit.topic, "  Deploy ");
        assert_eq!(hit.source, "local-faq");
    }

    #[test]
    fn miss_returns_hint() {
        let miss = lookup(FaqArgs { topic: "pricing".into() });
        assert!(miss.answer.starts_with("No exact FAQ hit"));
    }
}
