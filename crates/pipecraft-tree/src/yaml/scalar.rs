//! Scalar rendering
//!
//! Decides between plain, quoted, and literal-block forms so that every
//! emitted scalar parses back to the same value.

use crate::node::Scalar;
use serde_yaml::Value as YamlValue;

/// How a scalar is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Rendered {
    /// Fits on the key line
    Inline(String),
    /// Literal block: header (`|` or `|-`) and body lines
    Block { header: &'static str, lines: Vec<String> },
}

const INDICATORS: &[char] = &[
    '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`',
];

pub(crate) fn render(scalar: &Scalar) -> Rendered {
    match scalar {
        Scalar::Null => Rendered::Inline("null".to_string()),
        Scalar::Bool(b) => Rendered::Inline(b.to_string()),
        Scalar::Int(i) => Rendered::Inline(i.to_string()),
        Scalar::Float(f) => Rendered::Inline(render_float(*f)),
        Scalar::String(s) => render_string(s),
    }
}

/// Render a map key; keys never use block form
pub(crate) fn render_key(key: &str) -> String {
    if is_plain_safe(key) && !key.contains([':', '#']) {
        key.to_string()
    } else {
        quote(key)
    }
}

fn render_float(f: f64) -> String {
    if f.is_nan() {
        ".nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { ".inf" } else { "-.inf" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

fn render_string(s: &str) -> Rendered {
    if s.contains('\n') {
        if let Some(block) = literal_block(s) {
            return block;
        }
        return Rendered::Inline(double_quote(s));
    }
    if is_plain_safe(s) {
        Rendered::Inline(s.to_string())
    } else {
        Rendered::Inline(quote(s))
    }
}

fn literal_block(s: &str) -> Option<Rendered> {
    if s.contains('\r') || s.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
        return None;
    }
    let (body, header) = match s.strip_suffix('\n') {
        Some(rest) if rest.ends_with('\n') => return None,
        Some(rest) => (rest, "|"),
        None => (s, "|-"),
    };
    // Indentation is inferred from the first non-empty line
    let first = body.lines().find(|line| !line.is_empty())?;
    if first.starts_with([' ', '\t']) {
        return None;
    }
    let lines = body.split('\n').map(str::to_string).collect();
    Some(Rendered::Block { header, lines })
}

fn is_plain_safe(s: &str) -> bool {
    let Some(first) = s.chars().next() else {
        return false;
    };
    if s.trim() != s {
        return false;
    }
    if s.chars().any(char::is_control) {
        return false;
    }
    if s.starts_with("---") || s.starts_with("...") {
        return false;
    }
    if INDICATORS.contains(&first) {
        // `-foo`, `?foo`, `:foo` are plain when not followed by a space
        let second = s.chars().nth(1);
        let allowed = matches!(first, '-' | '?' | ':') && second.is_some_and(|c| c != ' ');
        if !allowed {
            return false;
        }
    }
    !(s.contains(": ") || s.contains(" #") || s.ends_with(':')) && reads_back_as(s)
}

/// Whether the text, written plain, parses back to the same string
///
/// The parser decides what counts as a boolean, null, or number, so its
/// resolution is the reference rather than a pattern of our own.
fn reads_back_as(s: &str) -> bool {
    matches!(serde_yaml::from_str::<YamlValue>(s), Ok(YamlValue::String(parsed)) if parsed == s)
}

fn quote(s: &str) -> String {
    if s.chars().any(char::is_control) {
        double_quote(s)
    } else {
        format!("'{}'", s.replace('\'', "''"))
    }
}

fn double_quote(s: &str) -> String {
    // JSON string escapes are a subset of YAML double-quoted escapes
    serde_json::Value::String(s.to_string()).to_string()
}
