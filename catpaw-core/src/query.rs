// Query string decoding

use serde_json::Value;
use std::collections::HashMap;

/// Decode a raw query string.
///
/// - `a=b` gives the string `"b"`
/// - a bare `a` gives `true`
///
/// Values are kept as received; numeric conversion is left to the
/// parameter that reads them. Later duplicates win. Empty keys are skipped.
///
/// ```
/// use catpaw_core::query::parse_query_string;
/// use serde_json::json;
///
/// let queries = parse_query_string("name=cat%20paw&debug&start=010&ratio=0.50");
/// assert_eq!(queries["name"], json!("cat paw"));
/// assert_eq!(queries["debug"], json!(true));
/// assert_eq!(queries["start"], json!("010"));
/// assert_eq!(queries["ratio"], json!("0.50"));
/// ```
pub fn parse_query_string(query: &str) -> HashMap<String, Value> {
    query
        .split('&')
        .filter_map(|part| {
            let (key, value) = match part.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (part, None),
            };
            if key.is_empty() {
                return None;
            }
            let key = decode(key);
            let value = match value {
                None => Value::Bool(true),
                Some(value) => Value::String(decode(value)),
            };
            Some((key, value))
        })
        .collect()
}

/// Percent-decode a query component, treating `+` as a space.
pub fn decode(component: &str) -> String {
    let spaced = component.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Render a query value the way it was received.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) | Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Boolean coercion accepting `1`, `true`, `on` and `yes` (case-insensitive).
pub fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}
