//! Hand-rolled JSON-Schema-subset validation .
//!
//! Carapace does not pull in a full JSON Schema implementation. Tool
//! argument schemas are restricted to a narrow, auditable subset — plain
//! `object`/`string`/`number`/`integer`/`boolean`/`array`/`null` types,
//! `required`, `enum`, and `pattern` — and are walked by hand both at
//! registration time (complexity budget) and call time (argument shape).

use crate::error::{SchemaViolation, ValidationFailure};
use serde_json::Value;

/// Maximum nesting depth a schema (and therefore a call's arguments) may
/// reach.
pub const MAX_SCHEMA_DEPTH: usize = 10;

/// Maximum number of properties summed across every nested object in a
/// schema.
pub const MAX_SCHEMA_PROPERTIES: usize = 128;

/// Validate a tool's declared schema against the complexity budget. This
/// runs once, at registration time.
pub fn validate_schema_budget(schema: &Value) -> Result<(), SchemaViolation> {
    let obj = schema.as_object().ok_or(SchemaViolation::RootNotObject)?;
    if obj.get("type").and_then(Value::as_str) != Some("object") {
        return Err(SchemaViolation::RootNotObject);
    }
    if obj.get("additionalProperties") != Some(&Value::Bool(false)) {
        return Err(SchemaViolation::AdditionalPropertiesNotForbidden);
    }

    let mut property_count = 0usize;
    walk_budget(schema, 1, &mut property_count, "$")?;
    if property_count > MAX_SCHEMA_PROPERTIES {
        return Err(SchemaViolation::TooManyProperties { count: property_count, max: MAX_SCHEMA_PROPERTIES });
    }
    Ok(())
}

fn walk_budget(node: &Value, depth: usize, property_count: &mut usize, path: &str) -> Result<(), SchemaViolation> {
    if depth > MAX_SCHEMA_DEPTH {
        return Err(SchemaViolation::TooDeep { depth, max: MAX_SCHEMA_DEPTH });
    }
    let Some(obj) = node.as_object() else { return Ok(()) };

    if obj.contains_key("$ref") {
        return Err(SchemaViolation::ContainsRef);
    }

    if let Some(pattern) = obj.get("pattern").and_then(Value::as_str) {
        if looks_catastrophic(pattern) {
            return Err(SchemaViolation::UnsafePattern { path: path.to_string() });
        }
    }

    if let Some(properties) = obj.get("properties").and_then(Value::as_object) {
        *property_count = property_count.saturating_add(properties.len());
        for (key, value) in properties {
            walk_budget(value, depth + 1, property_count, &format!("{path}.{key}"))?;
        }
    }

    if let Some(items) = obj.get("items") {
        walk_budget(items, depth + 1, property_count, &format!("{path}[]"))?;
    }

    Ok(())
}

/// Reject patterns with an obvious nested-quantifier shape, the classic
/// cause of catastrophic regex backtracking (e.g. `(a+)+`, `(a*)*`).
/// This is a heuristic, not a proof: it catches the common case without
/// pulling in a regex-complexity analysis crate.
fn looks_catastrophic(pattern: &str) -> bool {
    let bytes = pattern.as_bytes();
    let mut depth = 0i32;
    let mut group_has_quantifier = vec![false];
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => {
                depth += 1;
                group_has_quantifier.push(false);
            },
            b')' => {
                let closed_had_quantifier = group_has_quantifier.pop().unwrap_or(false);
                depth -= 1;
                if depth >= 0 {
                    let followed_by_quantifier =
                        matches!(bytes.get(i + 1), Some(b'+' | b'*' | b'?') | Some(b'{'));
                    if closed_had_quantifier && followed_by_quantifier {
                        return true;
                    }
                }
            },
            b'+' | b'*' => {
                if let Some(last) = group_has_quantifier.last_mut() {
                    *last = true;
                }
            },
            _ => {},
        }
    }
    false
}

/// Validate call-time `arguments` against a tool's registered schema
/// (stage 3). Returns the bare field name and reason of the first failure
/// (e.g. `field:"name"`, not a JSON-path-prefixed `"$.name"`).
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Result<(), ValidationFailure> {
    walk_value(schema, arguments, "")
}

/// Join a parent field path with a child segment, omitting the leading
/// separator at the top level so a top-level field reports its bare name.
fn join_field(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}.{segment}")
    }
}

fn walk_value(schema: &Value, value: &Value, path: &str) -> Result<(), ValidationFailure> {
    let Some(schema_obj) = schema.as_object() else { return Ok(()) };

    if let Some(expected_type) = schema_obj.get("type").and_then(Value::as_str) {
        if !matches_type(expected_type, value) {
            return Err(ValidationFailure::new(path, format!("expected type {expected_type}")));
        }
    }

    if let Some(allowed) = schema_obj.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            return Err(ValidationFailure::new(path, "value is not one of the allowed enum values"));
        }
    }

    match value {
        Value::Object(map) => {
            let properties = schema_obj.get("properties").and_then(Value::as_object);
            if let Some(required) = schema_obj.get("required").and_then(Value::as_array) {
                for field in required {
                    let Some(name) = field.as_str() else { continue };
                    if !map.contains_key(name) {
                        return Err(ValidationFailure::new(join_field(path, name), "required field is missing"));
                    }
                }
            }
            for (key, child) in map {
                match properties.and_then(|p| p.get(key)) {
                    Some(child_schema) => walk_value(child_schema, child, &join_field(path, key))?,
                    None => {
                        return Err(ValidationFailure::new(
                            join_field(path, key),
                            "field is not declared in the tool's schema",
                        ));
                    },
                }
            }
        },
        Value::Array(items) => {
            if let Some(item_schema) = schema_obj.get("items") {
                for (index, item) in items.iter().enumerate() {
                    walk_value(item_schema, item, &format!("{path}[{index}]"))?;
                }
            }
        },
        _ => {},
    }

    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_schema() -> Value {
        json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["path"],
            "properties": {
                "path": { "type": "string" },
                "limit": { "type": "integer" },
            },
        })
    }

    #[test]
    fn accepts_well_formed_schema() {
        assert!(validate_schema_budget(&valid_schema()).is_ok());
    }

    #[test]
    fn rejects_missing_additional_properties_false() {
        let schema = json!({ "type": "object", "properties": {} });
        assert_eq!(validate_schema_budget(&schema), Err(SchemaViolation::AdditionalPropertiesNotForbidden));
    }

    #[test]
    fn rejects_ref() {
        let schema = json!({
            "type": "object",
            "additionalProperties": false,
            "properties": { "x": { "$ref": "#/definitions/foo" } },
        });
        assert_eq!(validate_schema_budget(&schema), Err(SchemaViolation::ContainsRef));
    }

    #[test]
    fn rejects_too_deep() {
        let mut schema = json!({ "type": "string" });
        for _ in 0..MAX_SCHEMA_DEPTH + 2 {
            schema = json!({
                "type": "object",
                "additionalProperties": false,
                "properties": { "nested": schema },
            });
        }
        let err = validate_schema_budget(&schema).unwrap_err();
        assert!(matches!(err, SchemaViolation::TooDeep { .. }));
    }

    #[test]
    fn rejects_catastrophic_pattern() {
        let schema = json!({
            "type": "object",
            "additionalProperties": false,
            "properties": { "x": { "type": "string", "pattern": "(a+)+$" } },
        });
        let err = validate_schema_budget(&schema).unwrap_err();
        assert!(matches!(err, SchemaViolation::UnsafePattern { .. }));
    }

    #[test]
    fn arguments_must_declare_all_fields() {
        let schema = valid_schema();
        let err = validate_arguments(&schema, &json!({ "path": "/tmp", "extra": 1 })).unwrap_err();
        assert_eq!(err.field, "extra");
    }

    #[test]
    fn arguments_enforce_required() {
        let schema = valid_schema();
        let err = validate_arguments(&schema, &json!({ "limit": 1 })).unwrap_err();
        assert_eq!(err.field, "path");
    }

    #[test]
    fn arguments_enforce_types() {
        let schema = valid_schema();
        let err = validate_arguments(&schema, &json!({ "path": 5 })).unwrap_err();
        assert_eq!(err.field, "path");
    }

    #[test]
    fn well_formed_arguments_pass() {
        let schema = valid_schema();
        assert!(validate_arguments(&schema, &json!({ "path": "/tmp", "limit": 10 })).is_ok());
    }
}
