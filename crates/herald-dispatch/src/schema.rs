// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parameter schemas for dispatchable operations.
//!
//! Each operation declares its parameters as a list of [`ParamSpec`]. The
//! same list renders the JSON Schema shown to the classifier and validates
//! the arguments the classifier sends back.

use herald_core::HeraldError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// JSON type of a parameter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// JSON Schema object describing `params`.
pub fn json_schema(params: &[ParamSpec]) -> Value {
    let properties: Map<String, Value> = params
        .iter()
        .map(|p| {
            (
                p.name.clone(),
                serde_json::json!({
                    "type": p.kind.to_string(),
                    "description": p.description,
                }),
            )
        })
        .collect();
    let required: Vec<&str> = params
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name.as_str())
        .collect();

    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Check `arguments` against `params`.
///
/// `null` arguments are treated as an empty object. Required parameters that
/// are absent or `null` are reported together in `missing`. Present values of
/// the wrong type are reported in the message. Undeclared keys pass through.
pub fn validate_arguments(
    operation: &str,
    params: &[ParamSpec],
    arguments: &Value,
) -> Result<Map<String, Value>, HeraldError> {
    let args = match arguments {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            return Err(HeraldError::Validation {
                operation: operation.to_string(),
                message: format!("arguments must be an object, got {}", json_type(other)),
                missing: Vec::new(),
            });
        }
    };

    let mut missing = Vec::new();
    let mut mismatched = Vec::new();
    for param in params {
        match args.get(&param.name) {
            None | Some(Value::Null) => {
                if param.required {
                    missing.push(param.name.clone());
                }
            }
            Some(value) if !param.kind.matches(value) => {
                mismatched.push(format!(
                    "`{}` must be {} (got {})",
                    param.name,
                    param.kind,
                    json_type(value)
                ));
            }
            Some(_) => {}
        }
    }

    if missing.is_empty() && mismatched.is_empty() {
        return Ok(args);
    }

    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing required fields: {}", missing.join(", ")));
    }
    parts.extend(mismatched);
    Err(HeraldError::Validation {
        operation: operation.to_string(),
        message: parts.join("; "),
        missing,
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("cell_id", ParamKind::Integer, "Cell to delete"),
            ParamSpec::required("reason", ParamKind::String, "Why"),
            ParamSpec::optional("notify", ParamKind::Boolean, "Notify members"),
        ]
    }

    #[test]
    fn valid_arguments_pass() {
        let args = json!({"cell_id": 7, "reason": "merged"});
        let map = validate_arguments("delete_cell", &params(), &args).expect("valid");
        assert_eq!(map["cell_id"], 7);
    }

    #[test]
    fn missing_and_null_fields_are_listed() {
        let args = json!({"reason": null});
        let err = validate_arguments("delete_cell", &params(), &args).unwrap_err();
        match err {
            HeraldError::Validation { missing, message, .. } => {
                assert_eq!(missing, vec!["cell_id", "reason"]);
                assert!(message.contains("cell_id, reason"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn type_mismatch_is_reported() {
        let args = json!({"cell_id": "seven", "reason": "x", "notify": "yes"});
        let err = validate_arguments("delete_cell", &params(), &args).unwrap_err();
        match err {
            HeraldError::Validation { missing, message, .. } => {
                assert!(missing.is_empty());
                assert!(message.contains("`cell_id` must be integer (got string)"));
                assert!(message.contains("`notify` must be boolean"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn float_is_not_an_integer() {
        let args = json!({"cell_id": 1.5, "reason": "x"});
        assert!(validate_arguments("delete_cell", &params(), &args).is_err());
    }

    #[test]
    fn null_arguments_mean_empty_object() {
        let err = validate_arguments("delete_cell", &params(), &Value::Null).unwrap_err();
        assert!(matches!(err, HeraldError::Validation { missing, .. } if missing.len() == 2));
        assert!(validate_arguments("noop", &[], &Value::Null).is_ok());
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        let err = validate_arguments("delete_cell", &params(), &json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("must be an object, got array"));
    }

    #[test]
    fn schema_lists_required_params() {
        let schema = json_schema(&params());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["cell_id"]["type"], "integer");
        assert_eq!(schema["required"], json!(["cell_id", "reason"]));
    }
}
