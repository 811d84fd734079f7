//! Structural validation layer
//!
//! The [`Validator`] is compiled once from a [`ServiceDefinition`] and checks
//! requests, responses and declared error payloads against the shapes the
//! definition declares. It checks types, required members, pattern and
//! length constraints, and rejects members the shape does not declare. It
//! knows nothing about business rules.
//!
//! All violations of a value are collected; validation does not stop at the
//! first problem.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::definition::{MemberLocation, MemberShape, MemberType, ServiceDefinition, Shape};
use crate::error::DefinitionError;

/// Machine-readable violation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCode {
    RequiredMemberMissing,
    TypeMismatch,
    PatternMismatch,
    LengthOutOfRange,
    UnknownMember,
    BodyNotObject,
    UnknownOperation,
    UndeclaredError,
}

impl ViolationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationCode::RequiredMemberMissing => "REQUIRED_MEMBER_MISSING",
            ViolationCode::TypeMismatch => "TYPE_MISMATCH",
            ViolationCode::PatternMismatch => "PATTERN_MISMATCH",
            ViolationCode::LengthOutOfRange => "LENGTH_OUT_OF_RANGE",
            ViolationCode::UnknownMember => "UNKNOWN_MEMBER",
            ViolationCode::BodyNotObject => "BODY_NOT_OBJECT",
            ViolationCode::UnknownOperation => "UNKNOWN_OPERATION",
            ViolationCode::UndeclaredError => "UNDECLARED_ERROR",
        }
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single structural violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Member path, empty for the value as a whole
    pub path: String,
    pub code: ViolationCode,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code,
            message: message.into(),
        }
    }
}

/// A value did not conform to its declared shape
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("Validation failed for {operation}: {} violation(s)", .violations.len())]
pub struct ValidationFailure {
    pub operation: String,
    pub violations: Vec<Violation>,
}

impl ValidationFailure {
    pub fn new(operation: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self {
            operation: operation.into(),
            violations,
        }
    }

    pub fn has_code(&self, code: ViolationCode) -> bool {
        self.violations.iter().any(|v| v.code == code)
    }

    /// Human-readable summary of all violations
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| {
                if v.path.is_empty() {
                    v.message.clone()
                } else {
                    format!("{}: {}", v.path, v.message)
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Untyped request fields as received by the gateway
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRequest {
    /// Path labels captured from the route template
    pub labels: BTreeMap<String, String>,
    /// Query string parameters
    pub query: BTreeMap<String, String>,
    /// Parsed JSON body, if any
    pub body: Option<Value>,
}

impl RawRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_body(body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

struct CompiledMember {
    name: String,
    shape: MemberShape,
    pattern: Option<Regex>,
}

struct CompiledShape {
    members: Vec<CompiledMember>,
}

impl CompiledShape {
    fn compile(shape_name: &str, shape: &Shape) -> Result<Self, DefinitionError> {
        let members = shape
            .members
            .iter()
            .map(|(name, member)| -> Result<CompiledMember, DefinitionError> {
                let pattern = member
                    .pattern
                    .as_deref()
                    .map(Regex::new)
                    .transpose()
                    .map_err(|e| DefinitionError::InvalidPattern {
                        shape: shape_name.to_string(),
                        member: name.clone(),
                        reason: e.to_string(),
                    })?;
                Ok(CompiledMember {
                    name: name.clone(),
                    shape: member.clone(),
                    pattern,
                })
            })
            .collect::<Result<Vec<_>, DefinitionError>>()?;
        Ok(Self { members })
    }

    fn is_declared(&self, name: &str) -> bool {
        self.members.iter().any(|m| m.name == name)
    }

    fn check(&self, value: &Map<String, Value>, violations: &mut Vec<Violation>) {
        for member in &self.members {
            match value.get(&member.name).filter(|v| !v.is_null()) {
                None if member.shape.required => violations.push(Violation::new(
                    &member.name,
                    ViolationCode::RequiredMemberMissing,
                    format!("Required member '{}' is missing", member.name),
                )),
                None => {}
                Some(v) => member.check(v, violations),
            }
        }

        for key in value.keys() {
            if !self.is_declared(key) {
                violations.push(Violation::new(
                    key,
                    ViolationCode::UnknownMember,
                    format!("Member '{}' is not declared by the shape", key),
                ));
            }
        }
    }
}

impl CompiledMember {
    fn check(&self, value: &Value, violations: &mut Vec<Violation>) {
        let type_ok = match self.shape.member_type {
            MemberType::String => value.is_string(),
            MemberType::Integer => value.is_i64() || value.is_u64(),
            MemberType::Boolean => value.is_boolean(),
        };
        if !type_ok {
            violations.push(Violation::new(
                &self.name,
                ViolationCode::TypeMismatch,
                format!(
                    "Member '{}' must be of type {}, found {}",
                    self.name,
                    self.shape.member_type,
                    json_type_name(value)
                ),
            ));
            return;
        }

        let Some(s) = value.as_str() else {
            return;
        };

        let length = s.chars().count();
        let too_short = self.shape.min_length.is_some_and(|min| length < min);
        let too_long = self.shape.max_length.is_some_and(|max| length > max);
        if too_short || too_long {
            violations.push(Violation::new(
                &self.name,
                ViolationCode::LengthOutOfRange,
                format!(
                    "Member '{}' has length {} outside of [{}, {}]",
                    self.name,
                    length,
                    self.shape.min_length.unwrap_or(0),
                    self.shape
                        .max_length
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "inf".to_string())
                ),
            ));
        }

        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(s) {
                violations.push(Violation::new(
                    &self.name,
                    ViolationCode::PatternMismatch,
                    format!(
                        "Member '{}' does not match pattern {}",
                        self.name,
                        pattern.as_str()
                    ),
                ));
            }
        }
    }
}

/// Validator compiled from a service definition
///
/// Read-only after construction; share it behind an `Arc`.
pub struct Validator {
    definition: Arc<ServiceDefinition>,
    shapes: HashMap<String, CompiledShape>,
}

impl Validator {
    /// Compile every shape of the definition, including its patterns
    pub fn compile(definition: Arc<ServiceDefinition>) -> Result<Self, DefinitionError> {
        let shapes = definition
            .shapes
            .iter()
            .map(|(name, shape)| -> Result<(String, CompiledShape), DefinitionError> {
                Ok((name.clone(), CompiledShape::compile(name, shape)?))
            })
            .collect::<Result<HashMap<_, _>, DefinitionError>>()?;

        tracing::debug!(
            service = %definition.service,
            shapes = shapes.len(),
            "Compiled validator"
        );

        Ok(Self { definition, shapes })
    }

    pub fn definition(&self) -> &Arc<ServiceDefinition> {
        &self.definition
    }

    /// Validate a raw request and assemble the operation input
    pub fn validate_input(
        &self,
        operation: &str,
        request: &RawRequest,
    ) -> Result<Value, ValidationFailure> {
        let (input_name, compiled) = self.lookup(operation, |op| &op.input)?;
        let shape = self.shape_definition(input_name);
        let mut violations = Vec::new();

        let empty = Map::new();
        let body = match &request.body {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(map)) => map,
            Some(other) => {
                violations.push(Violation::new(
                    "",
                    ViolationCode::BodyNotObject,
                    format!("Request body must be a JSON object, found {}", json_type_name(other)),
                ));
                &empty
            }
        };

        let mut assembled = Map::new();
        for member in &compiled.members {
            let value = match member.shape.location {
                MemberLocation::Body => body.get(&member.name).cloned(),
                MemberLocation::Label => request
                    .labels
                    .get(&member.name)
                    .map(|s| Value::String(s.clone())),
                MemberLocation::Query => request
                    .query
                    .get(&member.name)
                    .map(|s| coerce_query(s, member.shape.member_type)),
            };
            if let Some(value) = value {
                assembled.insert(member.name.clone(), value);
            }
        }

        for key in body.keys() {
            let declared_in_body = shape
                .and_then(|s| s.members.get(key))
                .is_some_and(|m| m.location == MemberLocation::Body);
            if !declared_in_body {
                violations.push(Violation::new(
                    key,
                    ViolationCode::UnknownMember,
                    format!("Body member '{}' is not declared by the input shape", key),
                ));
            }
        }

        compiled.check(&assembled, &mut violations);

        if violations.is_empty() {
            Ok(Value::Object(assembled))
        } else {
            Err(ValidationFailure::new(operation, violations))
        }
    }

    /// Validate a handler's output
    pub fn validate_output(&self, operation: &str, output: &Value) -> Result<(), ValidationFailure> {
        let (_, compiled) = self.lookup(operation, |op| &op.output)?;
        check_object(operation, compiled, output)
    }

    /// Validate a typed error: it must be declared for the operation and its
    /// payload must match the error shape
    pub fn validate_error(
        &self,
        operation: &str,
        error_name: &str,
        payload: &Value,
    ) -> Result<(), ValidationFailure> {
        let declared = self
            .definition
            .operation(operation)
            .is_some_and(|op| op.declares_error(error_name));
        if !declared {
            return Err(ValidationFailure::new(
                operation,
                vec![Violation::new(
                    "",
                    ViolationCode::UndeclaredError,
                    format!("Error '{}' is not declared for {}", error_name, operation),
                )],
            ));
        }

        let compiled = self
            .shapes
            .get(error_name)
            .ok_or_else(|| unknown_operation(operation))?;
        check_object(operation, compiled, payload)
    }

    fn lookup<'a, F>(
        &'a self,
        operation: &str,
        select: F,
    ) -> Result<(&'a str, &'a CompiledShape), ValidationFailure>
    where
        F: Fn(&'a crate::definition::OperationDefinition) -> &'a String,
    {
        let op = self
            .definition
            .operation(operation)
            .ok_or_else(|| unknown_operation(operation))?;
        let shape_name = select(op);
        let compiled = self
            .shapes
            .get(shape_name)
            .ok_or_else(|| unknown_operation(operation))?;
        Ok((shape_name.as_str(), compiled))
    }

    fn shape_definition(&self, name: &str) -> Option<&Shape> {
        self.definition.shape(name)
    }
}

fn check_object(
    operation: &str,
    compiled: &CompiledShape,
    value: &Value,
) -> Result<(), ValidationFailure> {
    let mut violations = Vec::new();
    match value {
        Value::Object(map) => compiled.check(map, &mut violations),
        other => violations.push(Violation::new(
            "",
            ViolationCode::BodyNotObject,
            format!("Value must be a JSON object, found {}", json_type_name(other)),
        )),
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure::new(operation, violations))
    }
}

fn unknown_operation(operation: &str) -> ValidationFailure {
    ValidationFailure::new(
        operation,
        vec![Violation::new(
            "",
            ViolationCode::UnknownOperation,
            format!("Operation '{}' is not declared", operation),
        )],
    )
}

fn coerce_query(raw: &str, member_type: MemberType) -> Value {
    match member_type {
        MemberType::String => Value::String(raw.to_string()),
        MemberType::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        MemberType::Boolean => match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> Validator {
        let definition = Arc::new(ServiceDefinition::bundled().unwrap());
        Validator::compile(definition).unwrap()
    }

    #[test]
    fn test_valid_echo_input() {
        let v = validator();
        let input = v
            .validate_input("Echo", &RawRequest::from_body(json!({"string": "hello"})))
            .unwrap();
        assert_eq!(input, json!({"string": "hello"}));
    }

    #[test]
    fn test_missing_required_member() {
        let v = validator();
        let err = v
            .validate_input("Echo", &RawRequest::from_body(json!({})))
            .unwrap_err();
        assert!(err.has_code(ViolationCode::RequiredMemberMissing));
        assert_eq!(err.operation, "Echo");
    }

    #[test]
    fn test_null_counts_as_missing() {
        let v = validator();
        let err = v
            .validate_input("Echo", &RawRequest::from_body(json!({"string": null})))
            .unwrap_err();
        assert!(err.has_code(ViolationCode::RequiredMemberMissing));
    }

    #[test]
    fn test_type_mismatch() {
        let v = validator();
        let err = v
            .validate_input("Echo", &RawRequest::from_body(json!({"string": 42})))
            .unwrap_err();
        assert!(err.has_code(ViolationCode::TypeMismatch));
    }

    #[test]
    fn test_pattern_mismatch() {
        let v = validator();
        let err = v
            .validate_input("Echo", &RawRequest::from_body(json!({"string": "bad\u{0007}"})))
            .unwrap_err();
        assert!(err.has_code(ViolationCode::PatternMismatch));
    }

    #[test]
    fn test_length_counts_characters() {
        let v = validator();
        let at_limit = "é".repeat(1024);
        assert!(v
            .validate_input("Echo", &RawRequest::from_body(json!({"string": at_limit})))
            .is_ok());

        let over = "a".repeat(1025);
        let err = v
            .validate_input("Echo", &RawRequest::from_body(json!({"string": over})))
            .unwrap_err();
        assert!(err.has_code(ViolationCode::LengthOutOfRange));
    }

    #[test]
    fn test_unknown_body_member_reported_once() {
        let v = validator();
        let err = v
            .validate_input(
                "Echo",
                &RawRequest::from_body(json!({"string": "abc", "extra": true})),
            )
            .unwrap_err();
        let unknown: Vec<_> = err
            .violations
            .iter()
            .filter(|v| v.code == ViolationCode::UnknownMember)
            .collect();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].path, "extra");
    }

    #[test]
    fn test_body_must_be_object() {
        let v = validator();
        let err = v
            .validate_input("Echo", &RawRequest::from_body(json!(["abc"])))
            .unwrap_err();
        assert!(err.has_code(ViolationCode::BodyNotObject));
    }

    #[test]
    fn test_label_member_read_from_labels() {
        let v = validator();
        let input = v
            .validate_input("Length", &RawRequest::new().with_label("string", "abc"))
            .unwrap();
        assert_eq!(input, json!({"string": "abc"}));

        // A body member with the label's name is not part of the body shape
        let err = v
            .validate_input("Length", &RawRequest::from_body(json!({"string": "abc"})))
            .unwrap_err();
        assert!(err.has_code(ViolationCode::UnknownMember));
        assert!(err.has_code(ViolationCode::RequiredMemberMissing));
    }

    #[test]
    fn test_unknown_operation() {
        let v = validator();
        let err = v.validate_input("Reverse", &RawRequest::new()).unwrap_err();
        assert!(err.has_code(ViolationCode::UnknownOperation));
    }

    #[test]
    fn test_validate_output() {
        let v = validator();
        assert!(v.validate_output("Length", &json!({"length": 3})).is_ok());
        assert!(v.validate_output("Length", &json!({"length": "3"})).is_err());
        assert!(v.validate_output("Length", &json!({"length": 3, "x": 1})).is_err());
        assert!(v.validate_output("Length", &json!(3)).is_err());
    }

    #[test]
    fn test_validate_error_requires_declaration() {
        let v = validator();
        let payload = json!({"message": "Cannot handle palindrome"});
        assert!(v.validate_error("Echo", "PalindromeException", &payload).is_ok());

        let err = v
            .validate_error("Length", "PalindromeException", &payload)
            .unwrap_err();
        assert!(err.has_code(ViolationCode::UndeclaredError));

        let err = v
            .validate_error("Echo", "PalindromeException", &json!({"message": ""}))
            .unwrap_err();
        assert!(err.has_code(ViolationCode::LengthOutOfRange));
    }

    #[test]
    fn test_query_coercion() {
        assert_eq!(coerce_query("42", MemberType::Integer), json!(42));
        assert_eq!(coerce_query("x", MemberType::Integer), json!("x"));
        assert_eq!(coerce_query("true", MemberType::Boolean), json!(true));
        assert_eq!(coerce_query("yes", MemberType::Boolean), json!("yes"));
    }

    const PAGED_DEFINITION: &str = r#"{
        "service": "Paged",
        "shapes": {
            "ListInput": {
                "members": {
                    "limit": { "type": "integer", "required": true, "location": "query" },
                    "verbose": { "type": "boolean", "location": "query" }
                }
            },
            "ListOutput": { "members": {} }
        },
        "operations": {
            "List": { "input": "ListInput", "output": "ListOutput", "http": { "method": "GET", "path": "/items" } }
        }
    }"#;

    fn paged() -> Validator {
        let definition = Arc::new(ServiceDefinition::from_json_str(PAGED_DEFINITION).unwrap());
        Validator::compile(definition).unwrap()
    }

    #[test]
    fn test_query_members_are_coerced() {
        let v = paged();
        let input = v
            .validate_input(
                "List",
                &RawRequest::new()
                    .with_query("limit", "25")
                    .with_query("verbose", "true")
                    .with_query("cursor", "ignored"),
            )
            .unwrap();
        assert_eq!(input, json!({"limit": 25, "verbose": true}));
    }

    #[test]
    fn test_query_member_type_mismatch() {
        let v = paged();
        let err = v
            .validate_input("List", &RawRequest::new().with_query("limit", "many"))
            .unwrap_err();
        assert!(err.has_code(ViolationCode::TypeMismatch));
        assert!(err.violations.iter().any(|v| v.path == "limit"));

        let err = v.validate_input("List", &RawRequest::new()).unwrap_err();
        assert!(err.has_code(ViolationCode::RequiredMemberMissing));
    }

    #[test]
    fn test_failure_summary() {
        let failure = ValidationFailure::new(
            "Echo",
            vec![
                Violation::new("string", ViolationCode::TypeMismatch, "bad type"),
                Violation::new("", ViolationCode::BodyNotObject, "not an object"),
            ],
        );
        assert_eq!(failure.summary(), "string: bad type; not an object");
        assert_eq!(failure.to_string(), "Validation failed for Echo: 2 violation(s)");
    }
}
