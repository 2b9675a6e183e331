//! Schema validation of request bodies.
//!
//! A schema is a whitelist of constraints, not a closed set of permitted
//! fields: body fields without a rule pass untouched. The walk is
//! exhaustive — one pass over the schema in field order, collecting every
//! violation it encounters.

use mockd_models::{FieldType, Schema, Violation};
use serde_json::{Map, Value};

/// Validate `body` against `schema`. An empty body behaves as `{}`; a
/// non-empty body that fails to parse is itself a violation rather than
/// a server error.
pub fn validate(schema: &Schema, body: &[u8]) -> Vec<Violation> {
    let parsed: Value = if body.is_empty() {
        Value::Object(Map::new())
    } else {
        match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(_) => return vec![Violation::UnparsableBody],
        }
    };

    // A non-object body (array, scalar) has no fields to look up.
    let empty = Map::new();
    let fields = parsed.as_object().unwrap_or(&empty);

    let mut violations = Vec::new();
    for (field, rule) in schema {
        match fields.get(field) {
            None => {
                if rule.required {
                    violations.push(Violation::MissingField {
                        field: field.clone(),
                    });
                }
            }
            Some(value) => {
                if let Some(expected) = rule.field_type {
                    if !type_matches(expected, value) {
                        violations.push(Violation::WrongType {
                            field: field.clone(),
                            expected,
                        });
                    }
                }
                if let Some(allowed) = &rule.one_of {
                    if !allowed.contains(value) {
                        violations.push(Violation::NotAllowed {
                            field: field.clone(),
                            allowed: allowed.clone(),
                        });
                    }
                }
            }
        }
    }
    violations
}

fn type_matches(expected: FieldType, value: &Value) -> bool {
    match expected {
        FieldType::Int => value.is_i64() || value.is_u64(),
        FieldType::Str => value.is_string(),
    }
}
