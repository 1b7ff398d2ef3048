use std::sync::LazyLock;

use regex::Regex;

use crate::routes::{normalize_modal_id, normalize_route};

static NAVIGATE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<<NAVIGATE:([^>\n]+)>>").expect("navigate tag pattern"));
static OPEN_MODAL_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<<OPEN_MODAL:([^>\n]+)>>").expect("modal tag pattern"));
static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("whitespace pattern"));

/// Visible answer text plus the syntactically valid tag targets found in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTags {
    pub answer: String,
    pub routes: Vec<String>,
    pub modal_ids: Vec<String>,
}

/// Pull `<<NAVIGATE:..>>` and `<<OPEN_MODAL:..>>` tags out of model text.
///
/// Every tag is removed from the visible text whether or not its target
/// is valid. Targets are returned in order of appearance, syntax-checked
/// but not yet checked against any allow-list.
///
/// Stripping repeats until no tag is left, since removing one tag (or
/// collapsing whitespace) can splice its neighbours into a new one.
pub fn extract(text: &str) -> ParsedTags {
    let mut parsed = ParsedTags {
        answer: collapse(text),
        ..Default::default()
    };

    while NAVIGATE_TAG.is_match(&parsed.answer) || OPEN_MODAL_TAG.is_match(&parsed.answer) {
        parsed.routes.extend(
            NAVIGATE_TAG
                .captures_iter(&parsed.answer)
                .filter_map(|c| c.get(1).and_then(|m| normalize_route(m.as_str()))),
        );
        parsed.modal_ids.extend(
            OPEN_MODAL_TAG
                .captures_iter(&parsed.answer)
                .filter_map(|c| c.get(1).and_then(|m| normalize_modal_id(m.as_str()))),
        );

        let next = {
            let stripped = NAVIGATE_TAG.replace_all(&parsed.answer, "");
            collapse(&OPEN_MODAL_TAG.replace_all(&stripped, ""))
        };
        parsed.answer = next;
    }

    parsed
}

fn collapse(text: &str) -> String {
    MULTI_SPACE.replace_all(text, " ").trim().to_string()
}
