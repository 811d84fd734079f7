//! Validating dispatcher
//!
//! The [`Dispatcher`] owns the request/response contract around handler
//! logic:
//!
//! 1. validate the raw request against the operation's input shape
//! 2. invoke the registered handler with an explicit context
//! 3. validate the output, or check that a returned error is declared for
//!    the operation and matches its shape
//!
//! Anything that falls outside the contract (a handler panic, a fault, an
//! output that fails validation, an error the operation does not declare)
//! is reported as an opaque [`DispatchError::Fault`]. Faults are logged with
//! a fault id; their detail never reaches the caller.

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

use string_wizard_contract::{
    DefinitionError, OperationName, RawRequest, ServiceDefinition, ValidationFailure, Validator,
};

use crate::context::InvocationContext;
use crate::operation::{DeclaredError, Fault, Operation, OperationError};

/// A declared error as delivered to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedError {
    /// Error shape name
    pub name: String,
    pub http_status: u16,
    pub payload: Value,
}

impl TypedError {
    /// The `message` member of the payload, if present
    pub fn message(&self) -> &str {
        self.payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

/// Outcome of a failed invocation, as seen by the gateway
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request did not match the input shape; handler logic never ran
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    /// A declared error returned by the handler
    #[error("{}: {}", .0.name, .0.message())]
    Typed(TypedError),

    /// Undeclared failure; detail is in the logs under `fault_id`
    #[error("Internal failure (fault id {fault_id})")]
    Fault { fault_id: String },
}

impl DispatchError {
    pub fn error_code(&self) -> &str {
        match self {
            DispatchError::Validation(_) => "ValidationException",
            DispatchError::Typed(e) => &e.name,
            DispatchError::Fault { .. } => "InternalFailure",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::Validation(_) => 400,
            DispatchError::Typed(e) => e.http_status,
            DispatchError::Fault { .. } => 500,
        }
    }
}

/// Errors raised while assembling a dispatcher
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Operation '{0}' is not declared in the service definition")]
    UndeclaredOperation(String),

    #[error("Operation '{0}' already has a registered handler")]
    DuplicateOperation(String),

    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

enum ErasedError {
    Declared { name: &'static str, payload: Value },
    Fault(Fault),
}

#[async_trait]
trait ErasedOperation: Send + Sync {
    async fn call(&self, input: Value, ctx: &InvocationContext) -> Result<Value, ErasedError>;
}

struct Erased<O>(O);

#[async_trait]
impl<O: Operation> ErasedOperation for Erased<O> {
    async fn call(&self, input: Value, ctx: &InvocationContext) -> Result<Value, ErasedError> {
        // The input already matches the declared shape, so a mismatch here
        // means the handler's types disagree with the definition.
        let input: O::Input = serde_json::from_value(input).map_err(|e| {
            ErasedError::Fault(Fault::msg(format!(
                "validated input does not deserialize into {} input: {}",
                O::NAME,
                e
            )))
        })?;

        match self.0.handle(input, ctx).await {
            Ok(output) => serde_json::to_value(output).map_err(|e| ErasedError::Fault(Fault::new(e))),
            Err(OperationError::Declared(error)) => {
                let name = error.shape_name();
                let payload =
                    serde_json::to_value(&error).map_err(|e| ErasedError::Fault(Fault::new(e)))?;
                Err(ErasedError::Declared { name, payload })
            }
            Err(OperationError::Fault(fault)) => Err(ErasedError::Fault(fault)),
        }
    }
}

/// Builder that registers handlers against a compiled validator
pub struct DispatcherBuilder {
    validator: Arc<Validator>,
    operations: BTreeMap<OperationName, Arc<dyn ErasedOperation>>,
}

impl DispatcherBuilder {
    pub fn new(validator: Arc<Validator>) -> Self {
        Self {
            validator,
            operations: BTreeMap::new(),
        }
    }

    /// Compile a validator for `definition` and start a builder
    pub fn for_definition(definition: Arc<ServiceDefinition>) -> Result<Self, RegistryError> {
        Ok(Self::new(Arc::new(Validator::compile(definition)?)))
    }

    /// Register a handler for an operation declared in the definition
    pub fn register<O: Operation>(mut self, operation: O) -> Result<Self, RegistryError> {
        let name = self
            .validator
            .definition()
            .operations
            .keys()
            .find(|n| n.as_str() == O::NAME)
            .cloned()
            .ok_or_else(|| RegistryError::UndeclaredOperation(O::NAME.to_string()))?;

        if self.operations.contains_key(&name) {
            return Err(RegistryError::DuplicateOperation(O::NAME.to_string()));
        }

        self.operations.insert(name, Arc::new(Erased(operation)));
        Ok(self)
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            validator: self.validator,
            operations: self.operations,
        }
    }
}

/// Dispatches validated requests to registered handlers
///
/// Holds no per-invocation state; share it behind an `Arc`.
#[derive(Clone)]
pub struct Dispatcher {
    validator: Arc<Validator>,
    operations: BTreeMap<OperationName, Arc<dyn ErasedOperation>>,
}

impl Dispatcher {
    pub fn builder(validator: Arc<Validator>) -> DispatcherBuilder {
        DispatcherBuilder::new(validator)
    }

    pub fn validator(&self) -> &Arc<Validator> {
        &self.validator
    }

    pub fn definition(&self) -> &Arc<ServiceDefinition> {
        self.validator.definition()
    }

    pub fn handles(&self, operation: &str) -> bool {
        self.operations.contains_key(operation)
    }

    /// Registered operations in name order
    pub fn operations(&self) -> impl Iterator<Item = &OperationName> {
        self.operations.keys()
    }

    /// Declared operations without a registered handler
    pub fn missing_operations(&self) -> Vec<OperationName> {
        let registered: BTreeSet<&OperationName> = self.operations.keys().collect();
        self.definition()
            .operations
            .keys()
            .filter(|name| !registered.contains(name))
            .cloned()
            .collect()
    }

    /// Validate, invoke and check one operation
    pub async fn invoke(
        &self,
        operation: &str,
        request: &RawRequest,
        ctx: &InvocationContext,
    ) -> Result<Value, DispatchError> {
        let start = Instant::now();

        let input = self.validator.validate_input(operation, request).map_err(|failure| {
            tracing::info!(
                request_id = %ctx.request_id,
                operation = %operation,
                violations = failure.violations.len(),
                "Request rejected by validation"
            );
            DispatchError::Validation(failure)
        })?;

        let Some(handler) = self.operations.get(operation) else {
            return Err(self.fault(ctx, operation, "no handler registered for operation"));
        };

        let ctx = &ctx.clone().for_operation(operation);
        let outcome = AssertUnwindSafe(handler.call(input, ctx))
            .catch_unwind()
            .await;

        let result = match outcome {
            Err(_) => Err(self.fault(ctx, operation, "handler panicked")),
            Ok(Ok(output)) => match self.validator.validate_output(operation, &output) {
                Ok(()) => Ok(output),
                Err(failure) => Err(self.fault(
                    ctx,
                    operation,
                    &format!("output failed validation: {}", failure.summary()),
                )),
            },
            Ok(Err(ErasedError::Declared { name, payload })) => {
                match self.validator.validate_error(operation, name, &payload) {
                    Ok(()) => Err(DispatchError::Typed(TypedError {
                        name: name.to_string(),
                        http_status: self
                            .definition()
                            .shape(name)
                            .map(|s| s.error_status())
                            .unwrap_or(400),
                        payload,
                    })),
                    Err(failure) => Err(self.fault(
                        ctx,
                        operation,
                        &format!("error '{}' rejected: {}", name, failure.summary()),
                    )),
                }
            }
            Ok(Err(ErasedError::Fault(fault))) => Err(self.fault(ctx, operation, &fault.detail())),
        };

        tracing::debug!(
            request_id = %ctx.request_id,
            operation = %operation,
            success = result.is_ok(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Invocation finished"
        );

        result
    }

    fn fault(&self, ctx: &InvocationContext, operation: &str, detail: &str) -> DispatchError {
        let fault_id = Uuid::new_v4().to_string();
        tracing::error!(
            request_id = %ctx.request_id,
            operation = %operation,
            fault_id = %fault_id,
            detail = %detail,
            "Undeclared fault in handler"
        );
        DispatchError::Fault { fault_id }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("service", &self.definition().service)
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}
