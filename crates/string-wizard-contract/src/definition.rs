//! Interface definition model
//!
//! A [`ServiceDefinition`] is the machine-readable contract of a service: the
//! shapes it exchanges, its operations with their declared errors, and the
//! HTTP binding of every operation. Definitions are immutable once loaded and
//! are verified on every load path, so a value of this type is always
//! internally consistent.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{DefinitionError, Result};
use crate::path::PathTemplate;

/// The String Wizard definition shipped with this crate
pub const BUNDLED_DEFINITION_JSON: &str = include_str!("../../../definitions/string-wizard.json");

/// Unique operation key within a definition
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperationName(String);

impl OperationName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_start = chars.next().is_some_and(|c| c.is_ascii_uppercase());
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric()) {
            return Err(DefinitionError::InvalidOperationName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OperationName {
    type Error = DefinitionError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<OperationName> for String {
    fn from(value: OperationName) -> Self {
        value.0
    }
}

impl FromStr for OperationName {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl Borrow<str> for OperationName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// HTTP methods an operation or static route may bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Lowercase form used as the OpenAPI path-item key
    pub fn openapi_key(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(format!("Unsupported HTTP method: {}", s)),
        }
    }
}

/// HTTP binding of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpBinding {
    pub method: HttpMethod,
    pub path: PathTemplate,
    /// Status code of a successful response
    #[serde(default = "default_success_code")]
    pub code: u16,
}

fn default_success_code() -> u16 {
    200
}

/// Whether a shape describes regular data or a declared error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Structure,
    Error,
}

/// Which side is blamed for a declared error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorFault {
    #[default]
    Client,
    Server,
}

impl ErrorFault {
    pub fn default_status(&self) -> u16 {
        match self {
            ErrorFault::Client => 400,
            ErrorFault::Server => 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    String,
    Integer,
    Boolean,
}

impl MemberType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberType::String => "string",
            MemberType::Integer => "integer",
            MemberType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an input member is read from in the HTTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberLocation {
    #[default]
    Body,
    Label,
    Query,
}

/// A member of a structure or error shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberShape {
    #[serde(rename = "type")]
    pub member_type: MemberType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub location: MemberLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Minimum length in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum length in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

/// A named structure or error shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    #[serde(default)]
    pub kind: ShapeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<ErrorFault>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(default)]
    pub members: BTreeMap<String, MemberShape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl Shape {
    pub fn is_error(&self) -> bool {
        self.kind == ShapeKind::Error
    }

    /// Status code used when this error reaches the caller
    pub fn error_status(&self) -> u16 {
        self.http_status
            .unwrap_or_else(|| self.fault.unwrap_or_default().default_status())
    }
}

/// A declared operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDefinition {
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub errors: Vec<String>,
    pub http: HttpBinding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl OperationDefinition {
    pub fn declares_error(&self, shape: &str) -> bool {
        self.errors.iter().any(|e| e == shape)
    }
}

/// A fixed response served by the gateway without invoking a handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticResponse {
    #[serde(default = "default_success_code")]
    pub status: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticRoute {
    pub method: HttpMethod,
    pub path: PathTemplate,
    #[serde(flatten)]
    pub response: StaticResponse,
}

/// What a path+method entry is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteBinding {
    Dispatch { operation: OperationName },
    Static(StaticResponse),
}

/// One path+method entry of the definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub method: HttpMethod,
    pub path: PathTemplate,
    pub binding: RouteBinding,
}

/// Machine-readable service contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub service: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub shapes: BTreeMap<String, Shape>,
    #[serde(default)]
    pub operations: BTreeMap<OperationName, OperationDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_routes: Vec<StaticRoute>,
}

impl ServiceDefinition {
    /// Parse and verify a JSON document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let definition: Self = serde_json::from_str(content)?;
        definition.verify()?;
        Ok(definition)
    }

    /// Parse and verify a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let definition: Self = serde_yaml::from_str(content)?;
        definition.verify()?;
        Ok(definition)
    }

    /// Load a definition file, choosing the format from its extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DefinitionError::FileError(format!(
                "Failed to read definition '{}': {}",
                path.display(),
                e
            ))
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let definition = match extension.as_str() {
            "json" => Self::from_json_str(&content)?,
            "yaml" | "yml" => Self::from_yaml_str(&content)?,
            other => return Err(DefinitionError::UnsupportedFormat(other.to_string())),
        };

        tracing::debug!(
            service = %definition.service,
            operations = definition.operations.len(),
            path = %path.display(),
            "Loaded service definition"
        );
        Ok(definition)
    }

    /// The definition shipped with this crate
    pub fn bundled() -> Result<Self> {
        Self::from_json_str(BUNDLED_DEFINITION_JSON)
    }

    pub fn operation(&self, name: &str) -> Option<&OperationDefinition> {
        self.operations.get(name)
    }

    /// Operations in name order
    pub fn operations(&self) -> impl Iterator<Item = (&OperationName, &OperationDefinition)> {
        self.operations.iter()
    }

    pub fn shape(&self, name: &str) -> Option<&Shape> {
        self.shapes.get(name)
    }

    /// All path+method entries, sorted by path then method
    pub fn route_entries(&self) -> Vec<RouteEntry> {
        let mut entries: Vec<RouteEntry> = self
            .operations
            .iter()
            .map(|(name, op)| RouteEntry {
                method: op.http.method,
                path: op.http.path.clone(),
                binding: RouteBinding::Dispatch {
                    operation: name.clone(),
                },
            })
            .chain(self.static_routes.iter().map(|route| RouteEntry {
                method: route.method,
                path: route.path.clone(),
                binding: RouteBinding::Static(route.response.clone()),
            }))
            .collect();

        entries.sort_by(|a, b| {
            a.path
                .as_str()
                .cmp(b.path.as_str())
                .then(a.method.cmp(&b.method))
        });
        entries
    }

    /// SHA-256 digest of the canonical JSON form
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&canonical))
    }

    /// Check internal consistency
    pub fn verify(&self) -> Result<()> {
        if self.service.trim().is_empty() {
            return Err(DefinitionError::EmptyServiceName);
        }

        for (shape_name, shape) in &self.shapes {
            verify_shape(shape_name, shape)?;
        }

        let mut routes = BTreeSet::new();
        for (name, op) in &self.operations {
            self.verify_operation(name, op)?;
            if !routes.insert((op.http.method, op.http.path.shape())) {
                return Err(DefinitionError::DuplicateRoute {
                    method: op.http.method.to_string(),
                    path: op.http.path.to_string(),
                });
            }
        }

        for route in &self.static_routes {
            verify_status(
                &format!("static route {} {}", route.method, route.path),
                route.response.status,
            )?;
            if !routes.insert((route.method, route.path.shape())) {
                return Err(DefinitionError::DuplicateRoute {
                    method: route.method.to_string(),
                    path: route.path.to_string(),
                });
            }
        }

        Ok(())
    }

    fn verify_operation(&self, name: &OperationName, op: &OperationDefinition) -> Result<()> {
        let lookup = |shape: &str| {
            self.shapes
                .get(shape)
                .ok_or_else(|| DefinitionError::UnknownShape {
                    operation: name.to_string(),
                    shape: shape.to_string(),
                })
        };
        let mismatch = |shape: &str, expected: &'static str| DefinitionError::ShapeRoleMismatch {
            operation: name.to_string(),
            shape: shape.to_string(),
            expected,
        };

        let input = lookup(&op.input)?;
        if input.is_error() {
            return Err(mismatch(&op.input, "a structure"));
        }
        if lookup(&op.output)?.is_error() {
            return Err(mismatch(&op.output, "a structure"));
        }

        let mut seen = BTreeSet::new();
        for error in &op.errors {
            if !lookup(error)?.is_error() {
                return Err(mismatch(error, "an error"));
            }
            if !seen.insert(error.as_str()) {
                return Err(DefinitionError::DuplicateError {
                    operation: name.to_string(),
                    shape: error.clone(),
                });
            }
        }

        verify_status(&format!("operation {}", name), op.http.code)?;

        let label_error = |label: &str, reason: &str| DefinitionError::LabelMismatch {
            operation: name.to_string(),
            label: label.to_string(),
            reason: reason.to_string(),
        };

        let path_labels: BTreeSet<&str> = op.http.path.labels().collect();
        for label in &path_labels {
            let member = input
                .members
                .get(*label)
                .ok_or_else(|| label_error(label, "no input member with this name"))?;
            if member.location != MemberLocation::Label {
                return Err(label_error(label, "input member is not bound to a label"));
            }
            if !member.required || member.member_type != MemberType::String {
                return Err(label_error(label, "label members must be required strings"));
            }
        }
        for (member_name, member) in &input.members {
            if member.location == MemberLocation::Label
                && !path_labels.contains(member_name.as_str())
            {
                return Err(label_error(member_name, "label missing from path template"));
            }
        }

        Ok(())
    }
}

fn verify_shape(shape_name: &str, shape: &Shape) -> Result<()> {
    if let Some(status) = shape.http_status {
        verify_status(&format!("shape {}", shape_name), status)?;
    }

    for (member_name, member) in &shape.members {
        let constraint = |reason: &str| DefinitionError::InvalidConstraint {
            shape: shape_name.to_string(),
            member: member_name.clone(),
            reason: reason.to_string(),
        };

        let has_string_constraint =
            member.pattern.is_some() || member.min_length.is_some() || member.max_length.is_some();
        if has_string_constraint && member.member_type != MemberType::String {
            return Err(constraint("pattern and length apply to strings only"));
        }
        if let (Some(min), Some(max)) = (member.min_length, member.max_length) {
            if min > max {
                return Err(constraint("min_length exceeds max_length"));
            }
        }
        if let Some(pattern) = &member.pattern {
            regex::Regex::new(pattern).map_err(|e| DefinitionError::InvalidPattern {
                shape: shape_name.to_string(),
                member: member_name.clone(),
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

fn verify_status(context: &str, status: u16) -> Result<()> {
    if (100..=599).contains(&status) {
        Ok(())
    } else {
        Err(DefinitionError::InvalidStatus {
            context: context.to_string(),
            status,
        })
    }
}
