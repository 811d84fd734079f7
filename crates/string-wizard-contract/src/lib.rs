//! String Wizard Contract
//!
//! The interface definition and the validation layer derived from it.
//!
//! ## Architecture
//!
//! 1. **Definition** (`definition`): the machine-readable service contract.
//!    Operations, their input/output shapes, declared error shapes and HTTP
//!    bindings, plus static (mock) routes served without a handler.
//!
//! 2. **Validation** (`validation`): a [`Validator`] compiled from a
//!    definition. Checks raw requests before they reach handler logic and
//!    handler results before they reach the caller.
//!
//! 3. **Paths** (`path`): `{label}` path templates shared by the routing
//!    binder and the gateway front.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use string_wizard_contract::{RawRequest, ServiceDefinition, Validator};
//!
//! let definition = Arc::new(ServiceDefinition::bundled().unwrap());
//! let validator = Validator::compile(definition).unwrap();
//!
//! let request = RawRequest::from_body(serde_json::json!({ "string": "hello" }));
//! let input = validator.validate_input("Echo", &request).unwrap();
//! assert_eq!(input["string"], "hello");
//! ```

pub mod definition;
pub mod error;
pub mod path;
pub mod validation;

pub use definition::{
    ErrorFault, HttpBinding, HttpMethod, MemberLocation, MemberShape, MemberType,
    OperationDefinition, OperationName, RouteBinding, RouteEntry, ServiceDefinition, Shape,
    ShapeKind, StaticResponse, StaticRoute, BUNDLED_DEFINITION_JSON,
};
pub use error::{DefinitionError, Result};
pub use path::{PathTemplate, Segment};
pub use validation::{RawRequest, ValidationFailure, Validator, Violation, ViolationCode};
