//! Integration tests for the validating dispatcher

use async_trait::async_trait;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use string_wizard_contract::{RawRequest, ServiceDefinition, ViolationCode};
use string_wizard_handlers::{
    is_palindrome, string_wizard_dispatcher, CallerIdentity, DeclaredError, DispatchError,
    Dispatcher, DispatcherBuilder, Fault, InvocationContext, Operation, OperationError,
};

fn dispatcher() -> Dispatcher {
    string_wizard_dispatcher(Arc::new(ServiceDefinition::bundled().unwrap())).unwrap()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn echo(dispatcher: &Dispatcher, s: &str) -> Result<Value, DispatchError> {
    dispatcher
        .invoke(
            "Echo",
            &RawRequest::from_body(json!({ "string": s })),
            &InvocationContext::anonymous(),
        )
        .await
}

async fn length(dispatcher: &Dispatcher, s: &str) -> Result<Value, DispatchError> {
    dispatcher
        .invoke(
            "Length",
            &RawRequest::new().with_label("string", s),
            &InvocationContext::anonymous(),
        )
        .await
}

#[tokio::test]
async fn test_echo_round_trip() {
    let dispatcher = dispatcher();
    let output = echo(&dispatcher, "hello").await.unwrap();
    assert_eq!(output, json!({ "string": "hello" }));
}

#[tokio::test]
async fn test_echo_palindrome_is_typed_error() {
    let dispatcher = dispatcher();
    let err = echo(&dispatcher, "racecar").await.unwrap_err();
    match err {
        DispatchError::Typed(typed) => {
            assert_eq!(typed.name, "PalindromeException");
            assert_eq!(typed.http_status, 400);
            assert_eq!(typed.message(), "Cannot handle palindrome");
        }
        other => panic!("expected typed error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_echo_empty_string_is_palindrome() {
    let dispatcher = dispatcher();
    let err = echo(&dispatcher, "").await.unwrap_err();
    assert!(matches!(err, DispatchError::Typed(_)));
}

#[tokio::test]
async fn test_echo_rejects_missing_member_before_handler() {
    let dispatcher = dispatcher();
    let err = dispatcher
        .invoke(
            "Echo",
            &RawRequest::from_body(json!({})),
            &InvocationContext::anonymous(),
        )
        .await
        .unwrap_err();
    match err {
        DispatchError::Validation(failure) => {
            assert!(failure.has_code(ViolationCode::RequiredMemberMissing))
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_echo_rejects_wrong_type_and_unknown_member() {
    let dispatcher = dispatcher();
    let err = dispatcher
        .invoke(
            "Echo",
            &RawRequest::from_body(json!({ "string": 42, "extra": true })),
            &InvocationContext::anonymous(),
        )
        .await
        .unwrap_err();
    match err {
        DispatchError::Validation(failure) => {
            assert!(failure.has_code(ViolationCode::TypeMismatch));
            assert!(failure.has_code(ViolationCode::UnknownMember));
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_length_counts_characters() {
    let dispatcher = dispatcher();
    assert_eq!(length(&dispatcher, "hello").await.unwrap(), json!({ "length": 5 }));
    assert_eq!(length(&dispatcher, "日本語").await.unwrap(), json!({ "length": 3 }));
}

#[tokio::test]
async fn test_unknown_operation_is_validation_failure() {
    let dispatcher = dispatcher();
    let err = dispatcher
        .invoke("Reverse", &RawRequest::new(), &InvocationContext::anonymous())
        .await
        .unwrap_err();
    match err {
        DispatchError::Validation(failure) => {
            assert!(failure.has_code(ViolationCode::UnknownOperation))
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
}

// A service whose single operation misbehaves on demand.

const FLAKY_DEFINITION: &str = r#"{
  "service": "Flaky",
  "version": "1",
  "shapes": {
    "FlakyInput": {
      "kind": "structure",
      "members": { "mode": { "type": "string", "required": true } }
    },
    "FlakyOutput": {
      "kind": "structure",
      "members": { "value": { "type": "string", "required": true } }
    },
    "Busy": {
      "kind": "error",
      "fault": "server",
      "http_status": 503,
      "members": { "message": { "type": "string", "required": true, "min_length": 1 } }
    },
    "Gone": {
      "kind": "error",
      "members": { "message": { "type": "string", "required": true } }
    }
  },
  "operations": {
    "Flaky": {
      "input": "FlakyInput",
      "output": "FlakyOutput",
      "errors": ["Busy"],
      "http": { "method": "POST", "path": "/flaky" }
    }
  }
}"#;

#[derive(Debug, Deserialize)]
struct FlakyInput {
    mode: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum FlakyOutput {
    Valid { value: String },
    Invalid { other: u32 },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum FlakyError {
    Busy { message: String },
    Gone { message: String },
}

impl DeclaredError for FlakyError {
    fn shape_name(&self) -> &'static str {
        match self {
            FlakyError::Busy { .. } => "Busy",
            FlakyError::Gone { .. } => "Gone",
        }
    }
}

struct Flaky;

#[async_trait]
impl Operation for Flaky {
    type Input = FlakyInput;
    type Output = FlakyOutput;
    type Error = FlakyError;
    const NAME: &'static str = "Flaky";

    async fn handle(
        &self,
        input: FlakyInput,
        ctx: &InvocationContext,
    ) -> Result<FlakyOutput, OperationError<FlakyError>> {
        match input.mode.as_str() {
            "ok" => Ok(FlakyOutput::Valid {
                value: ctx.caller.to_string(),
            }),
            "busy" => Err(OperationError::declared(FlakyError::Busy {
                message: "try later".to_string(),
            })),
            "busy-empty" => Err(OperationError::declared(FlakyError::Busy {
                message: String::new(),
            })),
            "gone" => Err(OperationError::declared(FlakyError::Gone {
                message: "gone".to_string(),
            })),
            "bad-output" => Ok(FlakyOutput::Invalid { other: 7 }),
            "fault" => Err(Fault::msg("database unreachable").into()),
            "panic" => panic!("handler bug"),
            other => Err(Fault::msg(format!("unexpected mode {}", other)).into()),
        }
    }
}

fn flaky() -> Dispatcher {
    let definition = Arc::new(ServiceDefinition::from_json_str(FLAKY_DEFINITION).unwrap());
    DispatcherBuilder::for_definition(definition)
        .unwrap()
        .register(Flaky)
        .unwrap()
        .build()
}

async fn run_flaky(mode: &str) -> Result<Value, DispatchError> {
    flaky()
        .invoke(
            "Flaky",
            &RawRequest::from_body(json!({ "mode": mode })),
            &InvocationContext::new(CallerIdentity::Principal("carol".to_string())),
        )
        .await
}

#[tokio::test]
async fn test_context_reaches_handler() {
    assert_eq!(run_flaky("ok").await.unwrap(), json!({ "value": "carol" }));
}

#[tokio::test]
async fn test_declared_error_uses_declared_status() {
    match run_flaky("busy").await.unwrap_err() {
        DispatchError::Typed(typed) => {
            assert_eq!(typed.name, "Busy");
            assert_eq!(typed.http_status, 503);
            assert_eq!(typed.payload, json!({ "message": "try later" }));
        }
        other => panic!("expected typed error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_contract_breaches_become_faults() {
    for mode in ["busy-empty", "gone", "bad-output", "fault", "panic"] {
        let err = run_flaky(mode).await.unwrap_err();
        match err {
            DispatchError::Fault { fault_id } => assert!(!fault_id.is_empty(), "mode {}", mode),
            other => panic!("mode {}: expected fault, got {:?}", mode, other),
        }
    }
}

#[tokio::test]
async fn test_fault_display_hides_detail() {
    let err = run_flaky("fault").await.unwrap_err();
    assert!(!err.to_string().contains("database"));
    assert_eq!(err.status_code(), 500);
}

proptest! {
    #[test]
    fn prop_echo_returns_non_palindromes(s in "[a-zA-Z0-9 ]{0,64}") {
        prop_assume!(!is_palindrome(&s));
        let output = runtime().block_on(echo(&dispatcher(), &s)).unwrap();
        prop_assert_eq!(output, json!({ "string": s }));
    }

    #[test]
    fn prop_echo_rejects_palindromes(half in "[a-z\u{e9}\u{4e2d}]{0,32}", middle in proptest::option::of("[a-z]")) {
        let mut s = half.clone();
        if let Some(m) = middle {
            s.push_str(&m);
        }
        s.extend(half.chars().rev());
        match runtime().block_on(echo(&dispatcher(), &s)) {
            Err(DispatchError::Typed(typed)) => {
                prop_assert_eq!(typed.name.as_str(), "PalindromeException");
                prop_assert!(!typed.message().is_empty());
            }
            other => prop_assert!(false, "expected typed error, got {:?}", other),
        }
    }

    #[test]
    fn prop_length_counts_characters(s in "[^\\p{Cc}]{1,64}") {
        let output = runtime().block_on(length(&dispatcher(), &s)).unwrap();
        prop_assert_eq!(output, json!({ "length": s.chars().count() }));
    }

    #[test]
    fn prop_faults_never_surface_as_typed(mode in "[a-z-]{0,12}") {
        let result = runtime().block_on(run_flaky(&mode));
        if let Err(DispatchError::Typed(typed)) = &result {
            prop_assert_eq!(typed.name.as_str(), "Busy");
            prop_assert_eq!(mode.as_str(), "busy");
        }
    }
}
