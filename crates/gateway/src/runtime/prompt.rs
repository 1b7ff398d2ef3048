//! System instructions for one exchange.

use pp_actions::AllowList;

/// Build the system message. Route and modal lists are the normalized
/// allow-lists of this exchange, so the model only ever sees values the
/// normalizer would accept.
pub fn system_prompt(allow: &AllowList, timezone: &str, locale: &str) -> String {
    let routes = allow.routes().join(", ");
    let modals = allow.modals().join(", ");

    [
        "You are a practical AI agent for developers.".to_string(),
        language_hint(locale),
        format!("The user's timezone is {timezone}; pass it to getDateTime when time matters."),
        "Use tools when they improve accuracy.".to_string(),
        "When user asks to add finance data, use createFinanceItem with kind/category/amount.".to_string(),
        "When user asks for finance distribution or trend visualization, call getFinanceOverview first.".to_string(),
        format!("Allowed website routes: {routes}."),
        format!("Allowed modal ids: {modals}."),
        "If you can return structured fields, use actions with { type: \"navigate\", to: \"/route\" } and { type: \"open_modal\", id: \"modal-id\" }.".to_string(),
        "If user asks for chart/visualization/data distribution, include UI blocks in field ui.".to_string(),
        "Supported ui block types: asset_donut and finance_trend_line.".to_string(),
        "asset_donut needs items: [{ label, amount }]. finance_trend_line needs points: [{ label, assets, liabilities }].".to_string(),
        "If user asks to add a new page section/canvas/module, return sections with slot \"after-b\" and one or more ui blocks.".to_string(),
        "When user clearly asks to go/open/navigate to a page, append one tag exactly like <<NAVIGATE:/route>> at the end of your answer.".to_string(),
        "When user asks to open a modal/dialog/popup, append one tag like <<OPEN_MODAL:modal-id>>.".to_string(),
        "Only use allowed routes.".to_string(),
        "Only use allowed modal ids.".to_string(),
    ]
    .join(" ")
}

fn language_hint(locale: &str) -> String {
    let lower = locale.to_ascii_lowercase();
    if lower == "zh-tw" || lower == "zh-hk" || lower.starts_with("zh-hant") {
        "Answer in Traditional Chinese unless user asks otherwise.".to_string()
    } else if lower.starts_with("zh") {
        "Answer in Simplified Chinese unless user asks otherwise.".to_string()
    } else {
        format!("Answer in the language of locale {locale} unless user asks otherwise.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_allowed_targets_and_tag_syntax() {
        let allow = AllowList::new(&["/".into(), "/pricing".into()], &["docs-quickstart".into()]);
        let p = system_prompt(&allow, "Asia/Taipei", "zh-TW");
        assert!(p.contains("Allowed website routes: /, /pricing."));
        assert!(p.contains("Allowed modal ids: docs-quickstart."));
        assert!(p.contains("<<NAVIGATE:/route>>"));
        assert!(p.contains("Traditional Chinese"));
        assert!(p.contains("Asia/Taipei"));
    }

    #[test]
    fn other_locales_get_a_generic_hint() {
        let p = system_prompt(&AllowList::default(), "UTC", "en-US");
        assert!(p.contains("locale en-US"));
    }
}
