use serde_json::Value;

/// Normalize header text by replacing control characters with spaces and collapsing whitespace
/// so that "Email\nAddress " matches the required header "Email Address".
pub fn normalize_header(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '\u{feff}')
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// A cell counts as empty when it is null or a string with nothing but whitespace.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Plain text rendering of a cell value, used for messages and string comparisons.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
