//! Free-text cleanup helpers shared by parsers and filters.

use std::sync::OnceLock;

use regex::Regex;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Collapse runs of whitespace, strip HTML entities, and trim.
pub fn clean_text(text: &str) -> String {
    static ENTITY: OnceLock<Regex> = OnceLock::new();
    let entity = ENTITY.get_or_init(|| Regex::new(r"&[a-z]+;").expect("static regex"));

    let text = whitespace_re().replace_all(text, " ");
    let text = entity.replace_all(&text, "");
    text.trim().to_string()
}

/// Normalize an article title for comparison: lowercase, drop common
/// "Breaking:"/"Update:" style prefixes, collapse whitespace.
pub fn normalize_title(title: &str) -> String {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    let prefix = PREFIX.get_or_init(|| {
        Regex::new(r"^(breaking:\s*|update:\s*|news:\s*|\s*-\s*)").expect("static regex")
    });

    let title = title.to_lowercase();
    let title = prefix.replace(&title, "");
    whitespace_re().replace_all(title.trim(), " ").to_string()
}

/// Truncate at a word boundary, appending `...` when shortened.
pub fn truncate_text(text: &str, max_length: usize) -> String {
    const SUFFIX: &str = "...";
    if text.chars().count() <= max_length {
        return text.to_string();
    }

    let budget = max_length.saturating_sub(SUFFIX.len());
    let truncated: String = text.chars().take(budget).collect();
    let cut = match truncated.rfind(' ') {
        Some(idx) if idx > 0 => &truncated[..idx],
        _ => truncated.as_str(),
    };
    format!("{}{}", cut, SUFFIX)
}
