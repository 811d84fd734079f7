//! Deployed handler set
//!
//! The binder's second input: which invocation address each operation's
//! handler was deployed at.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use string_wizard_contract::OperationName;

use crate::error::BindingError;

/// Invocation address of a deployed handler (for example a function ARN or
/// `local://Echo`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerAddress(String);

impl HandlerAddress {
    /// Trim and validate an address; empty addresses and addresses with
    /// embedded whitespace are rejected
    pub fn new(address: impl AsRef<str>) -> Result<Self, String> {
        let trimmed = address.as_ref().trim();
        if trimmed.is_empty() {
            return Err("address is empty".to_string());
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(format!("address '{}' contains whitespace", trimmed));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// In-process address for an operation
    pub fn local(operation: &OperationName) -> Self {
        Self(format!("local://{}", operation))
    }
}

impl fmt::Display for HandlerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operation name to handler address, one address per operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HandlerSet {
    handlers: BTreeMap<OperationName, HandlerAddress>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from pairs in any order. Repeating a pair is harmless;
    /// two different addresses for one operation are a conflict.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, BindingError>
    where
        I: IntoIterator<Item = (OperationName, HandlerAddress)>,
    {
        let mut set = Self::new();
        for (operation, address) in pairs {
            set.insert(operation, address)?;
        }
        Ok(set)
    }

    /// Build a set from raw string pairs, validating names and addresses
    pub fn from_raw<I, K, V>(pairs: I) -> Result<Self, BindingError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut set = Self::new();
        for (operation, address) in pairs {
            let operation_str = operation.as_ref();
            let name = OperationName::new(operation_str)
                .map_err(|_| BindingError::UndeclaredOperation(operation_str.to_string()))?;
            let address = HandlerAddress::new(address.as_ref()).map_err(|reason| {
                BindingError::InvalidAddress {
                    operation: operation_str.to_string(),
                    reason,
                }
            })?;
            set.insert(name, address)?;
        }
        Ok(set)
    }

    pub fn insert(
        &mut self,
        operation: OperationName,
        address: HandlerAddress,
    ) -> Result<(), BindingError> {
        match self.handlers.get(&operation) {
            Some(existing) if existing != &address => Err(BindingError::ConflictingHandler {
                operation: operation.to_string(),
                first: existing.to_string(),
                second: address.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.handlers.insert(operation, address);
                Ok(())
            }
        }
    }

    pub fn get(&self, operation: &str) -> Option<&HandlerAddress> {
        self.handlers.get(operation)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OperationName, &HandlerAddress)> {
        self.handlers.iter()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
