//! Small string helpers shared by the adapters and the reconciliation engine.

/// Normalizes whitespace for matching: trims the ends and collapses every
/// internal whitespace run to a single space. Matching keys (title, venue)
/// are compared through this, nothing else.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits a comma-joined author list into ordered display names.
pub fn split_authors(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from)
        .collect()
}

/// Returns `None` for empty or whitespace-only cells, the trimmed value
/// otherwise. Adapters use this to fold empty strings into one
/// missing-value sentinel.
pub fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
