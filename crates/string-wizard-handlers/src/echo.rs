//! Echo operation
//!
//! Returns its input unchanged, except that palindromes are refused with the
//! declared `PalindromeException`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::InvocationContext;
use crate::operation::{DeclaredError, Operation, OperationError};

/// Message carried by every palindrome rejection
pub const PALINDROME_MESSAGE: &str = "Cannot handle palindrome";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoInput {
    pub string: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoOutput {
    pub string: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PalindromeException {
    pub message: String,
}

/// Errors declared for Echo
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EchoError {
    Palindrome(PalindromeException),
}

impl DeclaredError for EchoError {
    fn shape_name(&self) -> &'static str {
        match self {
            EchoError::Palindrome(_) => "PalindromeException",
        }
    }
}

/// Whether `s` reads the same reversed, compared character by character.
/// Case-sensitive; the empty string is a palindrome.
pub fn is_palindrome(s: &str) -> bool {
    s.chars().eq(s.chars().rev())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EchoOperation;

#[async_trait]
impl Operation for EchoOperation {
    type Input = EchoInput;
    type Output = EchoOutput;
    type Error = EchoError;

    const NAME: &'static str = "Echo";

    async fn handle(
        &self,
        input: EchoInput,
        ctx: &InvocationContext,
    ) -> Result<EchoOutput, OperationError<EchoError>> {
        tracing::info!(
            request_id = %ctx.request_id,
            caller = %ctx.caller,
            "Received Echo operation"
        );

        if is_palindrome(&input.string) {
            return Err(OperationError::declared(EchoError::Palindrome(
                PalindromeException {
                    message: PALINDROME_MESSAGE.to_string(),
                },
            )));
        }

        Ok(EchoOutput {
            string: input.string,
        })
    }
}
