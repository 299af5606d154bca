//! Name and value formatting shared by the report templates.

use regex::Regex;
use std::sync::LazyLock;
use url::form_urlencoded;

use crate::error::ReportError;

static NON_ID_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9 -]").unwrap());

/// Namespace of a fixture: its full name without the trailing `.<name>`.
pub fn namespace_of(full_name: &str, name: &str) -> String {
    if full_name == name {
        return String::new();
    }
    full_name
        .strip_suffix(name)
        .and_then(|rest| rest.strip_suffix('.'))
        .unwrap_or(full_name)
        .to_string()
}

/// Test case name without its namespace. Only the part before the argument
/// list of a parameterized case is searched for the last dot, so
/// `Ns.Class.Method(1.5)` becomes `Method(1.5)`.
pub fn case_display_name(name: &str) -> &str {
    let head = match name.find('(') {
        Some(paren) => &name[..paren],
        None => name,
    };
    match head.rfind('.') {
        Some(dot) => &name[dot + 1..],
        None => name,
    }
}

/// Anchor for a fixture's details dialog. The index keeps ids unique when
/// two fixtures share a name.
pub fn anchor_id(fixture_name: &str, index: usize) -> String {
    let encoded = encode_name(fixture_name);
    let sanitized = NON_ID_CHARS.replace_all(&encoded, "");
    format!("modal-{}-{}", sanitized, index)
}

/// Form encoding that leaves `!`, `(` and `)` unescaped and writes escapes
/// in lowercase hex, so existing report links keep their ids.
fn encode_name(name: &str) -> String {
    let serialized: String = form_urlencoded::byte_serialize(name.as_bytes()).collect();
    let mut encoded = String::with_capacity(serialized.len());
    let mut rest = serialized.as_str();
    while let Some(pos) = rest.find('%') {
        encoded.push_str(&rest[..pos]);
        let escape = &rest[pos..(pos + 3).min(rest.len())];
        match escape {
            "%21" => encoded.push('!'),
            "%28" => encoded.push('('),
            "%29" => encoded.push(')'),
            other => encoded.push_str(&other.to_ascii_lowercase()),
        }
        rest = &rest[pos + escape.len()..];
    }
    encoded.push_str(rest);
    encoded
}

/// Parses an invariant-culture duration in seconds at single precision.
pub fn parse_duration(raw: &str) -> Result<f32, ReportError> {
    raw.trim()
        .parse::<f32>()
        .map_err(|_| ReportError::malformed(format!("invalid duration '{}'", raw)))
}

pub fn format_duration(seconds: f32) -> String {
    format!("{}s", seconds)
}
