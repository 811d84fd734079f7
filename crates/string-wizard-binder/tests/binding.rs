//! Integration tests for the routing binder

use proptest::prelude::*;
use std::path::PathBuf;

use string_wizard_binder::cli::{self, BindCommands, DocumentFormat, OutputFormat};
use string_wizard_binder::{
    bind, BindCli, BindingError, CliError, ExitCode, HandlerAddress, HandlerSet, RouteTarget,
};
use string_wizard_contract::{OperationName, ServiceDefinition};

const WIDE_DEFINITION: &str = r#"
service: Wide
version: "1"
shapes:
  Empty:
    kind: structure
    members: {}
operations:
  Alpha: { input: Empty, output: Empty, http: { method: GET, path: /alpha } }
  Bravo: { input: Empty, output: Empty, http: { method: POST, path: /bravo } }
  Charlie: { input: Empty, output: Empty, http: { method: PUT, path: /charlie } }
  Delta: { input: Empty, output: Empty, http: { method: DELETE, path: /delta } }
  Echo: { input: Empty, output: Empty, http: { method: POST, path: /echo } }
static_routes:
  - { method: OPTIONS, path: /alpha, status: 204 }
  - { method: GET, path: /health, status: 200, body: { ok: true } }
"#;

fn wide() -> ServiceDefinition {
    ServiceDefinition::from_yaml_str(WIDE_DEFINITION).unwrap()
}

fn pairs() -> Vec<(OperationName, HandlerAddress)> {
    ["Alpha", "Bravo", "Charlie", "Delta", "Echo"]
        .iter()
        .map(|name| {
            (
                OperationName::new(*name).unwrap(),
                HandlerAddress::new(format!("arn:fn:{}", name.to_lowercase())).unwrap(),
            )
        })
        .collect()
}

fn mapping(table: &string_wizard_binder::RoutingTable) -> Vec<(String, String)> {
    table
        .dispatch_targets()
        .map(|(op, addr)| (op.to_string(), addr.to_string()))
        .collect()
}

proptest! {
    #[test]
    fn prop_bind_is_order_independent(order in Just(pairs()).prop_shuffle(), repeat in 0usize..5) {
        let definition = wide();
        let baseline = bind(&definition, &HandlerSet::from_pairs(pairs()).unwrap()).unwrap();

        // Repeating a pair anywhere in the input changes nothing
        let mut shuffled = order.clone();
        shuffled.push(order[repeat].clone());
        let table = bind(&definition, &HandlerSet::from_pairs(shuffled).unwrap()).unwrap();

        prop_assert_eq!(mapping(&table), mapping(&baseline));
        prop_assert_eq!(table.fingerprint(), baseline.fingerprint());
        prop_assert_eq!(&table, &baseline);
    }

    #[test]
    fn prop_any_missing_handler_fails(skip in 0usize..5) {
        let definition = wide();
        let mut partial = pairs();
        let (removed, _) = partial.remove(skip);

        let err = bind(&definition, &HandlerSet::from_pairs(partial).unwrap()).unwrap_err();
        match err {
            BindingError::MissingHandler { operation, .. } => {
                prop_assert_eq!(operation, removed.to_string())
            }
            other => prop_assert!(false, "expected missing handler, got {:?}", other),
        }
    }
}

#[test]
fn test_static_routes_pass_through() {
    let table = bind(&wide(), &HandlerSet::from_pairs(pairs()).unwrap()).unwrap();
    assert_eq!(table.len(), 7);

    let health = table
        .lookup("GET".parse().unwrap(), "/health")
        .unwrap();
    match health.target {
        RouteTarget::Static(response) => {
            assert_eq!(response.status, 200);
            assert_eq!(response.body, Some(serde_json::json!({ "ok": true })));
        }
        other => panic!("expected static route, got {:?}", other),
    }
}

#[test]
fn test_empty_handler_set_fails_for_bundled_definition() {
    let err = bind(&ServiceDefinition::bundled().unwrap(), &HandlerSet::new()).unwrap_err();
    assert!(matches!(err, BindingError::MissingHandler { operation, .. } if operation == "Echo"));
}

// CLI

const CONFIG: &str = r#"
region = "us-west-2"
account = "123456789012"
api_id = "a1b2c3"

[handlers]
Echo = "arn:aws:lambda:us-west-2:123456789012:function:echo"
Length = "arn:aws:lambda:us-west-2:123456789012:function:length"
"#;

fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn cli(command: BindCommands) -> BindCli {
    BindCli {
        verbose: 0,
        command,
    }
}

#[test]
fn test_bind_command_writes_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(&dir, "binder.toml", CONFIG);
    let output = dir.path().join("manifest.json");

    let code = cli::run(cli(BindCommands::Bind {
        definition: None,
        config,
        output: Some(output.clone()),
        format: DocumentFormat::Json,
    }))
    .unwrap();
    assert_eq!(code, ExitCode::Success);

    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(manifest["service"], "StringWizard");
    assert_eq!(manifest["policy"]["Statement"][0]["Principal"], "*");
    assert_eq!(manifest["permissions"].as_array().unwrap().len(), 2);
    assert_eq!(
        manifest["gateway"]["paths"]["/echo"]["post"]["x-amazon-apigateway-integration"]["type"],
        "aws_proxy"
    );
    assert_eq!(manifest["stage"]["logging_level"], "INFO");
}

#[test]
fn test_bind_command_fails_without_output_on_missing_handler() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(
        &dir,
        "binder.toml",
        "region = \"us-west-2\"\n[handlers]\nEcho = \"arn:echo\"\n",
    );
    let output = dir.path().join("manifest.json");

    let err = cli::run(cli(BindCommands::Bind {
        definition: None,
        config,
        output: Some(output.clone()),
        format: DocumentFormat::Json,
    }))
    .unwrap_err();
    assert!(matches!(err, CliError::Binding(_)));
    assert_eq!(ExitCode::from_error(&err), ExitCode::BindingFailure);
    assert!(!output.exists());
}

#[test]
fn test_bind_command_requires_account_and_api_id() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(
        &dir,
        "binder.toml",
        "region = \"us-west-2\"\n[handlers]\nEcho = \"arn:echo\"\nLength = \"arn:length\"\n",
    );
    let output = dir.path().join("manifest.json");

    let err = cli::run(cli(BindCommands::Bind {
        definition: None,
        config,
        output: Some(output.clone()),
        format: DocumentFormat::Json,
    }))
    .unwrap_err();
    assert!(matches!(err, CliError::Config(_)));
    assert_eq!(ExitCode::from_error(&err), ExitCode::InvalidInput);
    assert!(!output.exists());
}

#[test]
fn test_check_command_reports_incomplete_set() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(
        &dir,
        "binder.yaml",
        "region: us-west-2\nhandlers:\n  Echo: arn:echo\n  Reverse: arn:reverse\n",
    );

    let code = cli::run(cli(BindCommands::Check {
        definition: None,
        config,
        format: OutputFormat::Json,
    }))
    .unwrap();
    assert_eq!(code, ExitCode::BindingFailure);
}

#[test]
fn test_routes_command_with_definition_file() {
    let dir = tempfile::tempdir().unwrap();
    let definition = write(&dir, "wide.yaml", WIDE_DEFINITION);
    let config = write(
        &dir,
        "binder.toml",
        "region = \"r\"\n[handlers]\nAlpha = \"a\"\nBravo = \"b\"\nCharlie = \"c\"\nDelta = \"d\"\nEcho = \"e\"\n",
    );

    let code = cli::run(cli(BindCommands::Routes {
        definition: Some(definition),
        config,
        format: OutputFormat::Yaml,
    }))
    .unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_missing_config_is_file_error() {
    let err = cli::run(cli(BindCommands::Routes {
        definition: None,
        config: PathBuf::from("/nonexistent/binder.toml"),
        format: OutputFormat::Table,
    }))
    .unwrap_err();
    assert_eq!(ExitCode::from_error(&err), ExitCode::FileError);
}
