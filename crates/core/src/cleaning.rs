use once_cell::sync::Lazy;
use regex::Regex;

static DISALLOWED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[^\w\s.,;:!?'"()\[\]{}\-/%&@#+=*<>$]"#).expect("allow-list pattern is valid")
});

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops characters outside the allow-list, collapses whitespace runs and trims.
pub fn clean_text(text: &str) -> String {
    let allowed = DISALLOWED.replace_all(text, "");
    normalize_whitespace(&allowed)
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
