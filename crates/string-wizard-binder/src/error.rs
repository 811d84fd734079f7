//! Error types for the routing binder

use string_wizard_contract::DefinitionError;
use thiserror::Error;

/// The binder could not produce a routing table
///
/// Every variant is a deployment-time failure: deployment stops and nothing
/// is emitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// A dispatch-requiring operation has no deployed handler
    #[error("No handler deployed for operation '{operation}' ({method} {path})")]
    MissingHandler {
        operation: String,
        method: String,
        path: String,
    },

    /// A handler was supplied for an operation the definition does not declare
    #[error("Handler supplied for undeclared operation '{0}'")]
    UndeclaredOperation(String),

    /// Two different addresses were supplied for one operation
    #[error("Conflicting handler addresses for operation '{operation}': '{first}' and '{second}'")]
    ConflictingHandler {
        operation: String,
        first: String,
        second: String,
    },

    /// A handler address is empty or malformed
    #[error("Invalid handler address for operation '{operation}': {reason}")]
    InvalidAddress { operation: String, reason: String },
}

impl BindingError {
    pub fn error_code(&self) -> &'static str {
        match self {
            BindingError::MissingHandler { .. } => "MISSING_HANDLER",
            BindingError::UndeclaredOperation(_) => "UNDECLARED_OPERATION",
            BindingError::ConflictingHandler { .. } => "CONFLICTING_HANDLER",
            BindingError::InvalidAddress { .. } => "INVALID_ADDRESS",
        }
    }
}

/// Binder configuration could not be loaded
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File error: {0}")]
    FileError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unsupported config format '{0}', expected .toml, .yaml or .yml")]
    UnsupportedFormat(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::FileError(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(format!("TOML error: {}", err))
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(format!("YAML error: {}", err))
    }
}

/// A deployment manifest could not be produced
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors surfaced by the `wizard-bind` CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File error: {0}")]
    FileError(String),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Binding failed: {0}")]
    Binding(#[from] BindingError),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<ManifestError> for CliError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::Binding(e) => CliError::Binding(e),
            ManifestError::Config(e) => CliError::Config(e),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::SerializationError(err.to_string())
    }
}
