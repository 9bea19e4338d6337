//! Filters available to manifest templates
//!
//! A deliberately small set: manifests mostly substitute scalars, with the
//! occasional block of embedded text or encoded data.

use base64::Engine as _;
use minijinja::Value;

/// Base64 encode a string
///
/// Usage: {{ TLSCert | b64encode }}
#[must_use]
pub fn b64encode(value: String) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

/// Quote a value with double quotes, escaping as YAML expects
///
/// Usage: {{ NodeIP | quote }}
#[must_use]
pub fn quote(value: Value) -> String {
    let s = match value.as_str() {
        Some(str_val) => str_val.to_string(),
        None => value.to_string(),
    };
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Indent every non-empty line, prefixed with a newline
///
/// Usage: {{ Corefile | nindent(4) }}
#[must_use]
pub fn nindent(value: String, spaces: usize) -> String {
    let mut result = String::with_capacity(1 + value.len() + spaces * value.lines().count());
    result.push('\n');
    result.push_str(&indent(value, spaces));
    result
}

/// Indent every non-empty line
///
/// Usage: {{ Corefile | indent(4) }}
#[must_use]
pub fn indent(value: String, spaces: usize) -> String {
    let pad = " ".repeat(spaces);

    value
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
