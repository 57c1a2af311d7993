//! Argument validation against a tool's declared JSON schema.
//!
//! Only the subset tools actually declare is checked: the top-level `type`,
//! `required` keys, primitive `type` of each declared property, and
//! `additionalProperties: false`. Unknown keywords are ignored.

use serde_json::Value;

/// Validate `args` against `schema`, returning a readable reason on failure.
pub fn validate(args: &Value, schema: &Value) -> Result<(), String> {
    let Some(schema) = schema.as_object() else {
        return Ok(());
    };

    if let Some(expected) = schema.get("type").and_then(Value::as_str)
        && !matches_type(args, expected)
    {
        return Err(format!("expected {expected}, got {}", type_name(args)));
    }

    let Some(object) = args.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(key) {
                return Err(format!("missing required field '{key}'"));
            }
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);

    if let Some(properties) = properties {
        for (key, value) in object {
            let Some(expected) = properties
                .get(key)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            if !matches_type(value, expected) {
                return Err(format!(
                    "field '{key}' must be {expected}, got {}",
                    type_name(value)
                ));
            }
        }
    }

    if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
        for key in object.keys() {
            if !properties.is_some_and(|p| p.contains_key(key)) {
                return Err(format!("unexpected field '{key}'"));
            }
        }
    }

    Ok(())
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
