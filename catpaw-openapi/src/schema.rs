//! Schemas of the framework's response envelopes.

use catpaw_core::ParameterKind;
use serde_json::{Value, json};

/// Schema of a parameter kind.
pub fn kind_schema(kind: ParameterKind) -> Value {
    match kind {
        ParameterKind::Bool => json!({ "type": "boolean" }),
        ParameterKind::Int => json!({ "type": "integer", "format": "int64" }),
        ParameterKind::Float => json!({ "type": "number", "format": "double" }),
        ParameterKind::String => json!({ "type": "string" }),
        ParameterKind::Value | ParameterKind::Dependency { .. } => json!({ "type": "object" }),
    }
}

/// `{type, status, message, data}` around `data`.
pub fn item_schema(data: Option<Value>) -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": { "type": "string" },
            "status": { "type": "integer", "format": "int32" },
            "message": { "type": "string" },
            "data": data.unwrap_or_else(|| json!({})),
        },
    })
}

/// Page envelope: links, neighbouring pages and an array of `items`.
pub fn page_schema(items: Option<Value>) -> Value {
    let page = json!({
        "type": "object",
        "properties": {
            "start": { "type": "integer", "format": "int64" },
            "size": { "type": "integer", "format": "int64" },
        },
    });
    json!({
        "type": "object",
        "properties": {
            "type": { "type": "string" },
            "status": { "type": "integer", "format": "int32" },
            "message": { "type": "string" },
            "previousHref": { "type": "string" },
            "nextHref": { "type": "string" },
            "previous": page,
            "next": page,
            "data": {
                "type": "array",
                "items": items.unwrap_or_else(|| json!({})),
            },
        },
    })
}

pub fn error_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "status": { "type": "integer", "format": "int32" },
            "message": { "type": "string" },
        },
    })
}
