/// Trim and validate a navigation target.
///
/// A route must start with exactly one `/` and contain only
/// `[A-Za-z0-9/_-]`.
pub fn normalize_route(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('/') || trimmed.starts_with("//") {
        return None;
    }
    let ok = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-'));
    ok.then(|| trimmed.to_string())
}

/// Trim and validate a modal identifier (`[A-Za-z0-9_-]+`).
pub fn normalize_modal_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let ok = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'));
    ok.then(|| trimmed.to_string())
}

fn normalize_list(raw: &[String], f: fn(&str) -> Option<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for candidate in raw.iter().filter_map(|r| f(r)) {
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

/// The routes and modal ids a single response may reference.
///
/// Membership is literal: a value passes only if it equals an entry after
/// both sides have been normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    routes: Vec<String>,
    modals: Vec<String>,
}

impl AllowList {
    pub fn new(routes: &[String], modals: &[String]) -> Self {
        Self {
            routes: normalize_list(routes, normalize_route),
            modals: normalize_list(modals, normalize_modal_id),
        }
    }

    /// Like [`new`](Self::new), but each list that normalizes to nothing is
    /// replaced by the corresponding fallback list.
    pub fn with_fallback(
        routes: &[String],
        modals: &[String],
        fallback_routes: &[String],
        fallback_modals: &[String],
    ) -> Self {
        let mut list = Self::new(routes, modals);
        if list.routes.is_empty() {
            list.routes = normalize_list(fallback_routes, normalize_route);
        }
        if list.modals.is_empty() {
            list.modals = normalize_list(fallback_modals, normalize_modal_id);
        }
        list
    }

    pub fn routes(&self) -> &[String] {
        &self.routes
    }

    pub fn modals(&self) -> &[String] {
        &self.modals
    }

    pub fn allows_route(&self, route: &str) -> bool {
        self.routes.iter().any(|r| r == route)
    }

    pub fn allows_modal(&self, id: &str) -> bool {
        self.modals.iter().any(|m| m == id)
    }
}
