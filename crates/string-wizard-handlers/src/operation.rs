//! Operation handler contract
//!
//! A handler maps a validated input and an [`InvocationContext`] to either an
//! output or one of the errors its operation declares. Anything else is a
//! [`Fault`]: an undeclared failure that never reaches the caller as a typed
//! error.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::context::InvocationContext;

/// An error an operation declares in the interface definition
pub trait DeclaredError: Serialize + fmt::Debug + Send + 'static {
    /// Name of the error shape in the interface definition
    fn shape_name(&self) -> &'static str;
}

/// Error set of an operation that declares no errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoErrors {}

impl DeclaredError for NoErrors {
    fn shape_name(&self) -> &'static str {
        match *self {}
    }
}

/// Undeclared failure inside handler logic
///
/// The wrapped detail is for logs only; callers see an opaque failure.
#[derive(Debug, Error)]
#[error("Undeclared fault: {0}")]
pub struct Fault(anyhow::Error);

impl Fault {
    pub fn new(err: impl Into<anyhow::Error>) -> Self {
        Fault(err.into())
    }

    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Fault(anyhow::Error::msg(message))
    }

    /// Internal detail, for logging
    pub fn detail(&self) -> String {
        format!("{:#}", self.0)
    }
}

/// Failure of a single operation invocation
#[derive(Debug, Error)]
pub enum OperationError<E: DeclaredError> {
    #[error("Declared error: {}", .0.shape_name())]
    Declared(E),

    #[error(transparent)]
    Fault(#[from] Fault),
}

impl<E: DeclaredError> OperationError<E> {
    pub fn declared(error: E) -> Self {
        OperationError::Declared(error)
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, OperationError::Fault(_))
    }
}

impl<E: DeclaredError> From<anyhow::Error> for OperationError<E> {
    fn from(err: anyhow::Error) -> Self {
        OperationError::Fault(Fault::new(err))
    }
}

/// A stateless operation handler
///
/// Implementations must not keep caller-specific state between invocations;
/// the gateway may retry or run invocations concurrently.
#[async_trait]
pub trait Operation: Send + Sync + 'static {
    type Input: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;
    type Error: DeclaredError;

    /// Operation name in the interface definition
    const NAME: &'static str;

    async fn handle(
        &self,
        input: Self::Input,
        ctx: &InvocationContext,
    ) -> Result<Self::Output, OperationError<Self::Error>>;
}
