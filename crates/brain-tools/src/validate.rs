use serde_json::Value;

use crate::error::ToolError;

/// Validate `input` against a tool's JSON-Schema `{properties, required}`
/// object. Checks missing required fields, type mismatches, and `enum`
/// membership. Does not attempt general JSON-Schema coverage — only the
/// subset tools actually declare.
pub fn validate_arguments(tool_name: &str, schema: &Value, input: &Value) -> Result<(), ToolError> {
    let invalid = |reason: String| ToolError::InvalidArguments { tool: tool_name.to_string(), reason };

    let obj = input.as_object().ok_or_else(|| invalid("arguments must be a JSON object".to_string()))?;

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for req in required {
            let Some(name) = req.as_str() else { continue };
            if !obj.contains_key(name) {
                return Err(invalid(format!("missing required field: {name}")));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        return Ok(());
    };

    for (key, value) in obj {
        let Some(prop_schema) = properties.get(key) else { continue };

        if let Some(expected_type) = prop_schema.get("type").and_then(|t| t.as_str()) {
            if !matches_type(expected_type, value) {
                return Err(invalid(format!(
                    "field '{key}' expected type {expected_type}, got {value}"
                )));
            }
        }

        if let Some(allowed) = prop_schema.get("enum").and_then(|e| e.as_array()) {
            if !allowed.contains(value) {
                return Err(invalid(format!("field '{key}' is not one of the allowed values")));
            }
        }
    }

    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "tz": { "type": "string" },
                "level": { "type": "string", "enum": ["low", "high"] },
            },
            "required": ["tz"],
        })
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let err = validate_arguments("t", &schema(), &serde_json::json!({})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let err = validate_arguments("t", &schema(), &serde_json::json!({ "tz": 5 })).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn enum_violation_is_rejected() {
        let input = serde_json::json!({ "tz": "Asia/Tokyo", "level": "medium" });
        let err = validate_arguments("t", &schema(), &input).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn valid_arguments_pass() {
        let input = serde_json::json!({ "tz": "Asia/Tokyo", "level": "high" });
        assert!(validate_arguments("t", &schema(), &input).is_ok());
    }
}
