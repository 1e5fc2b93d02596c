//! Argument contracts for tools.
//!
//! Each tool's `inputSchema` is generated with `schemars` from its parameter
//! struct. The contract here is read back from that schema and checked
//! against call arguments before the tool runs, so every violating field is
//! reported at once instead of the first serde error.

use rmcp::model::JsonObject;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Expected shape of a single argument.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Any JSON number.
    Number,
    /// A JSON number without a fractional part.
    Integer,
    /// A string of at least `min_len` characters.
    String { min_len: usize },
    /// A JSON boolean.
    Boolean,
    /// One of a fixed set of strings.
    Enum(Vec<String>),
    /// Anything; the tool checks it itself.
    Any,
}

impl FieldKind {
    /// Read the kind from one property of a generated schema.
    fn from_property(property: &Value) -> Self {
        if let Some(values) = enum_values(property) {
            return Self::Enum(values);
        }

        let ty = match property.get("type") {
            Some(Value::String(ty)) => Some(ty.as_str()),
            Some(Value::Array(types)) => types
                .iter()
                .filter_map(Value::as_str)
                .find(|ty| *ty != "null"),
            _ => None,
        };

        match ty {
            Some("number") => Self::Number,
            Some("integer") => Self::Integer,
            Some("boolean") => Self::Boolean,
            Some("string") => Self::String {
                min_len: property
                    .get("minLength")
                    .and_then(Value::as_u64)
                    .and_then(|n| usize::try_from(n).ok())
                    .unwrap_or(0),
            },
            _ => Self::Any,
        }
    }

    fn check(&self, value: &Value) -> Option<String> {
        match self {
            Self::Number if value.is_number() => None,
            Self::Number => Some("expected a number".to_string()),
            Self::Integer if value.is_i64() || value.is_u64() => None,
            Self::Integer => Some("expected an integer".to_string()),
            Self::Boolean if value.is_boolean() => None,
            Self::Boolean => Some("expected a boolean".to_string()),
            Self::String { min_len } => match value.as_str() {
                Some(s) if s.chars().count() >= *min_len => None,
                Some(_) => Some(format!("must be at least {min_len} character(s) long")),
                None => Some("expected a string".to_string()),
            },
            Self::Enum(allowed) => match value.as_str() {
                Some(s) if allowed.iter().any(|a| a == s) => None,
                _ => Some(format!("must be one of: {}", allowed.join(", "))),
            },
            Self::Any => None,
        }
    }
}

/// String enums come out of schemars either as `enum` or as a `oneOf` of
/// `const` variants (when variants carry docs).
fn enum_values(property: &Value) -> Option<Vec<String>> {
    if let Some(values) = property.get("enum").and_then(Value::as_array) {
        return values
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect();
    }

    let variants = property
        .get("oneOf")
        .or_else(|| property.get("anyOf"))?
        .as_array()?;
    let mut names = Vec::new();
    for variant in variants {
        match variant.get("const").and_then(Value::as_str) {
            Some(name) => names.push(name.to_string()),
            None => names.extend(enum_values(variant)?),
        }
    }
    Some(names)
}

/// Follow a local `$ref` into `$defs` (or draft-07 `definitions`).
fn resolve<'a>(root: &'a JsonObject, property: &'a Value) -> &'a Value {
    let Some(reference) = property.get("$ref").and_then(Value::as_str) else {
        return property;
    };
    reference
        .strip_prefix("#/$defs/")
        .map(|name| ("$defs", name))
        .or_else(|| reference.strip_prefix("#/definitions/").map(|name| ("definitions", name)))
        .and_then(|(section, name)| root.get(section)?.get(name))
        .unwrap_or(property)
}

/// One named argument of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

/// A single failed constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractViolation {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The full argument contract of a tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputContract {
    fields: Vec<FieldSpec>,
}

impl InputContract {
    /// Derive the contract from an object schema. Fields are kept in name
    /// order so violations are reported deterministically.
    pub fn from_schema(schema: &JsonObject) -> Self {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut fields: Vec<FieldSpec> = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| {
                properties
                    .iter()
                    .map(|(name, property)| FieldSpec {
                        name: name.clone(),
                        kind: FieldKind::from_property(resolve(schema, property)),
                        required: required.contains(&name.as_str()),
                    })
                    .collect()
            })
            .unwrap_or_default();
        fields.sort_by(|a, b| a.name.cmp(&b.name));

        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Check `arguments` against every field.
    ///
    /// `null` counts as absent. Fields the contract does not mention are
    /// ignored.
    pub fn validate(&self, arguments: &Map<String, Value>) -> Result<(), Vec<ContractViolation>> {
        let violations: Vec<ContractViolation> = self
            .fields
            .iter()
            .filter_map(|spec| {
                let message = match arguments.get(&spec.name) {
                    None | Some(Value::Null) if spec.required => Some("is required".to_string()),
                    None | Some(Value::Null) => None,
                    Some(value) => spec.kind.check(value),
                };
                message.map(|message| ContractViolation {
                    field: spec.name.clone(),
                    message,
                })
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Join violations into one human-readable line.
pub fn describe_violations(violations: &[ContractViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::handler::server::tool::schema_for_type;
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    #[serde(rename_all = "lowercase")]
    enum Op {
        Add,
        Sqrt,
    }

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct Params {
        /// Operation to run.
        operation: Op,
        a: f64,
        b: Option<f64>,
        #[schemars(length(min = 1))]
        label: Option<String>,
        repeat: Option<u32>,
    }

    fn contract() -> InputContract {
        InputContract::from_schema(&schema_for_type::<Params>())
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_contract_follows_generated_schema() {
        let contract = contract();
        let summary: Vec<_> = contract
            .fields()
            .iter()
            .map(|f| (f.name.as_str(), f.required))
            .collect();
        assert_eq!(
            summary,
            vec![("a", true), ("b", false), ("label", false), ("operation", true), ("repeat", false)]
        );
        assert_eq!(contract.fields()[1].kind, FieldKind::Number);
        assert_eq!(contract.fields()[2].kind, FieldKind::String { min_len: 1 });
        assert_eq!(
            contract.fields()[3].kind,
            FieldKind::Enum(vec!["add".to_string(), "sqrt".to_string()])
        );
        assert_eq!(contract.fields()[4].kind, FieldKind::Integer);
    }

    #[test]
    fn test_valid_arguments_pass() {
        assert!(contract().validate(&args(json!({"operation": "add", "a": 1, "b": 2}))).is_ok());
        assert!(contract().validate(&args(json!({"operation": "sqrt", "a": 9}))).is_ok());
    }

    #[test]
    fn test_every_violation_is_reported() {
        let violations = contract()
            .validate(&args(json!({"operation": "modulo", "b": "x", "repeat": 1.5})))
            .unwrap_err();
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["a", "b", "operation", "repeat"]);
        assert_eq!(violations[0].message, "is required");
        assert_eq!(violations[1].message, "expected a number");
        assert_eq!(violations[2].message, "must be one of: add, sqrt");
        assert_eq!(violations[3].message, "expected an integer");
    }

    #[test]
    fn test_null_optional_is_absent() {
        assert!(contract().validate(&args(json!({"operation": "sqrt", "a": 4, "b": null}))).is_ok());
    }

    #[test]
    fn test_string_min_length() {
        let violations = contract()
            .validate(&args(json!({"operation": "add", "a": 1, "label": ""})))
            .unwrap_err();
        assert_eq!(violations[0].to_string(), "label: must be at least 1 character(s) long");
    }

    #[test]
    fn test_documented_variants_and_draft07_refs() {
        let schema = json!({
            "type": "object",
            "properties": {
                "mode": { "$ref": "#/definitions/Mode" },
                "extra": {}
            },
            "required": ["mode"],
            "definitions": {
                "Mode": { "oneOf": [
                    { "const": "fast", "description": "Fast" },
                    { "const": "slow", "description": "Slow" }
                ]}
            }
        });
        let contract = InputContract::from_schema(schema.as_object().unwrap());
        assert_eq!(contract.fields()[0].kind, FieldKind::Any);
        assert_eq!(
            contract.fields()[1].kind,
            FieldKind::Enum(vec!["fast".to_string(), "slow".to_string()])
        );
        assert!(contract.validate(&args(json!({"mode": "slow", "extra": [1]}))).is_ok());
        assert!(contract.validate(&args(json!({"mode": "warp"}))).is_err());
    }

    #[test]
    fn test_schema_without_properties_accepts_anything() {
        let contract = InputContract::from_schema(&JsonObject::new());
        assert!(contract.fields().is_empty());
        assert!(contract.validate(&args(json!({"x": 1}))).is_ok());
    }
}
