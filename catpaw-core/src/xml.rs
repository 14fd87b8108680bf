//! JSON value to XML rendering used by XML responses.
//!
//! The document root is always `<nodes>`; array items and numeric object
//! keys become `<node>` elements.

use serde_json::Value;

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>"#;

/// Render `value` as an XML document rooted at `<nodes>`.
///
/// ```
/// use serde_json::json;
///
/// let xml = catpaw_core::xml::to_xml(&json!({"name": "a<b", "tags": ["x", "y"]}));
/// assert_eq!(
///     xml,
///     r#"<?xml version="1.0" encoding="UTF-8" ?><nodes><name>a&lt;b</name><tags><node>x</node><node>y</node></tags></nodes>"#
/// );
/// ```
pub fn to_xml(value: &Value) -> String {
    to_xml_with(value, "nodes", "node")
}

/// Same as [`to_xml`] with custom root and item element names.
pub fn to_xml_with(value: &Value, root: &str, item: &str) -> String {
    let mut xml = String::from(HEADER);
    xml.push('<');
    xml.push_str(root);
    xml.push('>');
    write_value(&mut xml, value, item);
    xml.push_str("</");
    xml.push_str(root);
    xml.push('>');
    xml
}

fn write_value(xml: &mut String, value: &Value, item: &str) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                let name = if key.parse::<f64>().is_ok() { item } else { key };
                write_element(xml, name, value, item);
            }
        }
        Value::Array(values) => {
            for value in values {
                write_element(xml, item, value, item);
            }
        }
        Value::Null => {}
        Value::Bool(b) => xml.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => xml.push_str(&n.to_string()),
        Value::String(s) => xml.push_str(&escape(s)),
    }
}

fn write_element(xml: &mut String, name: &str, value: &Value, item: &str) {
    xml.push('<');
    xml.push_str(name);
    xml.push('>');
    write_value(xml, value, item);
    xml.push_str("</");
    xml.push_str(name);
    xml.push('>');
}

/// Escape the five XML special characters.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_root() {
        assert_eq!(
            to_xml(&json!("hello")),
            r#"<?xml version="1.0" encoding="UTF-8" ?><nodes>hello</nodes>"#
        );
    }

    #[test]
    fn test_numeric_keys_become_node() {
        let xml = to_xml(&json!({"0": 1, "1": true, "status": null}));
        assert!(xml.contains("<node>1</node><node>true</node><status></status>"));
    }

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape(r#"'a' & "b""#), "&#039;a&#039; &amp; &quot;b&quot;");
    }
}
