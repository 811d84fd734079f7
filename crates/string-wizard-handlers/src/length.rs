//! Length operation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::InvocationContext;
use crate::operation::{NoErrors, Operation, OperationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthInput {
    pub string: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthOutput {
    pub length: u64,
}

/// Counts the characters (Unicode scalar values) of a string. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthOperation;

#[async_trait]
impl Operation for LengthOperation {
    type Input = LengthInput;
    type Output = LengthOutput;
    type Error = NoErrors;

    const NAME: &'static str = "Length";

    async fn handle(
        &self,
        input: LengthInput,
        ctx: &InvocationContext,
    ) -> Result<LengthOutput, OperationError<NoErrors>> {
        tracing::info!(
            request_id = %ctx.request_id,
            caller = %ctx.caller,
            "Received Length operation"
        );

        Ok(LengthOutput {
            length: input.string.chars().count() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn length(s: &str) -> u64 {
        LengthOperation
            .handle(
                LengthInput {
                    string: s.to_string(),
                },
                &InvocationContext::anonymous(),
            )
            .await
            .unwrap()
            .length
    }

    #[tokio::test]
    async fn test_length_counts_characters() {
        assert_eq!(length("").await, 0);
        assert_eq!(length("hello").await, 5);
        assert_eq!(length("héllo").await, 5);
        assert_eq!(length("🦀🦀").await, 2);
    }
}
