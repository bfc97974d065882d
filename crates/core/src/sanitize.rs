//! Reply sanitization.
//!
//! The model is instructed never to surface internal routing, but it still
//! occasionally leaks structured fragments (`setor: "..."`, `tag: "..."`)
//! into the customer-facing text. Everything here is pure and total: no
//! input can make these functions fail.

use std::sync::LazyLock;

use regex::Regex;

static FIELD_LEAKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)setor:\s*".*?"\s*"#,
        r#"(?i)especialista:\s*".*?"\s*"#,
        r#"(?i)tags?:\s*".*?"\s*"#,
        r#"(?i)tags?:\s*\[.*?\]\s*"#,
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid field leak regex"))
    .collect()
});

static QUOTED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?im)^[\s:-]*".*?"[\s:-]*$"#).expect("valid quoted line regex")
});

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\r?\n){2,}").expect("valid blank run regex"));

static SPEECH_DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-zA-Z0-9áéíóúÁÉÍÓÚâêîôûÂÊÎÔÛãõÃÕçÇ!?.,;:\s]")
        .expect("valid speech filter regex")
});

/// Strips residual structured-field leakage from a model reply, collapses
/// runs of blank lines to a single blank line and trims the result.
///
/// Idempotent: `sanitize_reply(sanitize_reply(x)) == sanitize_reply(x)`.
pub fn sanitize_reply(text: &str) -> String {
    let mut output = text.to_owned();
    for pattern in FIELD_LEAKS.iter() {
        output = pattern.replace_all(&output, "").into_owned();
    }
    output = QUOTED_LINE.replace_all(&output, "").into_owned();
    output = BLANK_RUN.replace_all(&output, "\n\n").into_owned();
    output.trim().to_owned()
}

/// Reduces a contact's display name to an addressable token: first
/// whitespace-separated word, alphanumeric characters only, at most 60
/// characters. May be empty when the name has no alphanumeric content.
pub fn sanitize_first_name(name: &str) -> String {
    name.split_whitespace()
        .next()
        .unwrap_or("")
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(60)
        .collect()
}

/// Prepares a reply for speech synthesis: keeps letters (including the
/// Portuguese accented set), digits, basic punctuation and whitespace.
pub fn speech_text(text: &str) -> String {
    SPEECH_DISALLOWED.replace_all(text, "").into_owned()
}
