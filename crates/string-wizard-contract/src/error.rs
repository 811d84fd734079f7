//! Error types for loading and verifying interface definitions

use thiserror::Error;

/// Errors raised while loading or verifying a service definition
///
/// Every variant is a build-time problem: a definition that fails to load
/// never reaches the validation layer or the routing binder.
#[derive(Error, Debug)]
pub enum DefinitionError {
    /// File access or I/O error
    #[error("File error: {0}")]
    FileError(String),

    /// Document could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// File extension is not a supported document format
    #[error("Unsupported definition format: {0}")]
    UnsupportedFormat(String),

    #[error("Service name must not be empty")]
    EmptyServiceName,

    #[error("Invalid operation name '{0}': must start with an uppercase letter and be ASCII alphanumeric")]
    InvalidOperationName(String),

    #[error("Invalid path template '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Operation '{operation}' references unknown shape '{shape}'")]
    UnknownShape { operation: String, shape: String },

    #[error("Operation '{operation}' uses shape '{shape}' where {expected} shape is required")]
    ShapeRoleMismatch {
        operation: String,
        shape: String,
        expected: &'static str,
    },

    #[error("Operation '{operation}' declares error '{shape}' more than once")]
    DuplicateError { operation: String, shape: String },

    #[error("Operation '{operation}' label '{label}': {reason}")]
    LabelMismatch {
        operation: String,
        label: String,
        reason: String,
    },

    #[error("Shape '{shape}' member '{member}' has invalid pattern: {reason}")]
    InvalidPattern {
        shape: String,
        member: String,
        reason: String,
    },

    #[error("Shape '{shape}' member '{member}' has invalid constraint: {reason}")]
    InvalidConstraint {
        shape: String,
        member: String,
        reason: String,
    },

    #[error("Route {method} {path} is declared more than once")]
    DuplicateRoute { method: String, path: String },

    #[error("Invalid HTTP status {status} for {context}")]
    InvalidStatus { context: String, status: u16 },
}

impl DefinitionError {
    /// Error code for machine-readable output
    pub fn error_code(&self) -> &'static str {
        match self {
            DefinitionError::FileError(_) => "FILE_ERROR",
            DefinitionError::ParseError(_) | DefinitionError::UnsupportedFormat(_) => {
                "PARSE_ERROR"
            }
            _ => "INVALID_DEFINITION",
        }
    }
}

impl From<std::io::Error> for DefinitionError {
    fn from(err: std::io::Error) -> Self {
        DefinitionError::FileError(err.to_string())
    }
}

impl From<serde_json::Error> for DefinitionError {
    fn from(err: serde_json::Error) -> Self {
        DefinitionError::ParseError(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for DefinitionError {
    fn from(err: serde_yaml::Error) -> Self {
        DefinitionError::ParseError(format!("YAML error: {}", err))
    }
}

/// Result type alias for definition operations
pub type Result<T> = std::result::Result<T, DefinitionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DefinitionError::UnknownShape {
            operation: "Echo".to_string(),
            shape: "Missing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Operation 'Echo' references unknown shape 'Missing'"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(DefinitionError::FileError("x".into()).error_code(), "FILE_ERROR");
        assert_eq!(DefinitionError::ParseError("x".into()).error_code(), "PARSE_ERROR");
        assert_eq!(DefinitionError::EmptyServiceName.error_code(), "INVALID_DEFINITION");
    }

    #[test]
    fn test_from_json_error() {
        let err: DefinitionError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, DefinitionError::ParseError(_)));
    }
}
