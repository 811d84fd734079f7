//! String Wizard Handlers
//!
//! Stateless operation handlers and the validating dispatcher that runs them.
//!
//! Every handler is a function of (validated input, [`InvocationContext`]) to
//! either an output or one of the errors its operation declares. The
//! [`Dispatcher`] wraps handlers with the validation layer on both sides and
//! turns everything outside the contract into an opaque fault.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use string_wizard_contract::ServiceDefinition;
//! use string_wizard_handlers::string_wizard_dispatcher;
//!
//! let definition = Arc::new(ServiceDefinition::bundled().unwrap());
//! let dispatcher = string_wizard_dispatcher(definition).unwrap();
//! assert!(dispatcher.missing_operations().is_empty());
//! ```

pub mod context;
pub mod dispatcher;
pub mod echo;
pub mod length;
pub mod operation;

use std::sync::Arc;

use string_wizard_contract::ServiceDefinition;

pub use context::{CallerIdentity, InvocationContext};
pub use dispatcher::{DispatchError, Dispatcher, DispatcherBuilder, RegistryError, TypedError};
pub use echo::{is_palindrome, EchoError, EchoInput, EchoOperation, EchoOutput, PalindromeException};
pub use length::{LengthInput, LengthOperation, LengthOutput};
pub use operation::{DeclaredError, Fault, NoErrors, Operation, OperationError};

/// Dispatcher with every StringWizard operation registered
pub fn string_wizard_dispatcher(
    definition: Arc<ServiceDefinition>,
) -> Result<Dispatcher, RegistryError> {
    Ok(DispatcherBuilder::for_definition(definition)?
        .register(EchoOperation)?
        .register(LengthOperation)?
        .build())
}
