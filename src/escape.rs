//! Output and source escaping helpers.

use std::fmt::Write;

/// HTML-escapes `text` so it is safe in element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    html_escape::encode_safe(text).into_owned()
}

/// Escapes `text` for use between double quotes in a Rhai string literal.
pub fn string_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(escaped, "\\u{:04x}", c as u32);
            }
            c => escaped.push(c),
        }
    }
    escaped
}

/// Double-quoted Rhai string literal holding `text`.
pub fn quote(text: &str) -> String {
    format!("\"{}\"", string_escape(text))
}
