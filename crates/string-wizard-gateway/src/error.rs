//! Error types for the gateway front

use axum::http::StatusCode;
use thiserror::Error;

use string_wizard_binder::BindingError;
use string_wizard_contract::DefinitionError;
use string_wizard_handlers::RegistryError;

/// The gateway could not be assembled or started
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Routing target {operation} -> {address} does not resolve to a handler")]
    UnresolvedTarget { operation: String, address: String },

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// A request rejected by the gateway before or around dispatch
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Caller is not allowed to invoke this API")]
    AccessDenied,

    #[error("Request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Request body is not valid JSON: {0}")]
    Serialization(String),

    #[error("No route for {method} {path}")]
    UnknownRoute { method: String, path: String },

    #[error("Invocation exceeded {0}ms")]
    Timeout(u64),
}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::AccessDenied => StatusCode::FORBIDDEN,
            RequestError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RequestError::Serialization(_) => StatusCode::BAD_REQUEST,
            RequestError::UnknownRoute { .. } => StatusCode::NOT_FOUND,
            RequestError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Value of `__type` in the response body
    pub fn error_type(&self) -> &'static str {
        match self {
            RequestError::AccessDenied => "AccessDenied",
            RequestError::BodyTooLarge { .. } => "PayloadTooLarge",
            RequestError::Serialization(_) => "SerializationException",
            RequestError::UnknownRoute { .. } => "UnknownOperationException",
            RequestError::Timeout(_) => "InternalFailure",
        }
    }

    /// Message shown to the caller; timeouts stay opaque
    pub fn public_message(&self) -> String {
        match self {
            RequestError::Timeout(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            RequestError::AccessDenied => "access_denied",
            RequestError::BodyTooLarge { .. } | RequestError::Serialization(_) => "bad_request",
            RequestError::UnknownRoute { .. } => "unknown_route",
            RequestError::Timeout(_) => "timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_status_codes() {
        assert_eq!(RequestError::AccessDenied.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            RequestError::BodyTooLarge { limit: 1 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            RequestError::Serialization("eof".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(RequestError::Timeout(10).status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_timeout_is_opaque() {
        let err = RequestError::Timeout(30000);
        assert_eq!(err.error_type(), "InternalFailure");
        assert_eq!(err.public_message(), "Internal server error");
    }
}
