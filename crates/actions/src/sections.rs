use pp_domain::agent::{AgentSection, SectionMode, SectionSlot};
use serde_json::Value;

use crate::ui::{normalize_blocks, normalize_title};

pub const MAX_SECTIONS: usize = 3;
pub const MAX_SECTION_BLOCKS: usize = 6;
pub const MAX_SECTION_ID_CHARS: usize = 48;
pub const SECTION_SLOT: &str = "after-b";

/// Lower-case, collapse everything outside `[a-z0-9_-]` into single
/// dashes, strip edge dashes, cap at 48 characters.
pub fn normalize_section_id(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        let keep = c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_';
        if keep {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let capped: String = out.trim_matches('-').chars().take(MAX_SECTION_ID_CHARS).collect();
    let capped = capped.trim_end_matches('-');
    (!capped.is_empty()).then(|| capped.to_string())
}

/// Id used when the model's id normalizes to nothing. `position` is
/// 1-based over the raw section list.
pub fn fallback_section_id(issued_at_ms: i64, position: usize) -> String {
    format!("section-c-{issued_at_ms}-{position}")
}

pub fn normalize_section(raw: &Value, position: usize, issued_at_ms: i64) -> Option<AgentSection> {
    if raw.get("slot").and_then(Value::as_str) != Some(SECTION_SLOT) {
        return None;
    }
    let raw_blocks = raw
        .get("blocks")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let mut blocks = normalize_blocks(raw_blocks);
    blocks.truncate(MAX_SECTION_BLOCKS);
    if blocks.is_empty() {
        return None;
    }
    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .and_then(normalize_section_id)
        .unwrap_or_else(|| fallback_section_id(issued_at_ms, position));

    Some(AgentSection {
        id,
        slot: SectionSlot::AfterB,
        mode: SectionMode::Ephemeral,
        title: normalize_title(raw.get("title").and_then(Value::as_str)),
        blocks,
    })
}

pub fn normalize_sections(raw: &[Value], issued_at_ms: i64) -> Vec<AgentSection> {
    raw.iter()
        .enumerate()
        .filter_map(|(i, s)| normalize_section(s, i + 1, issued_at_ms))
        .take(MAX_SECTIONS)
        .collect()
}
