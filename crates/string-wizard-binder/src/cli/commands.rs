//! CLI command definitions for the routing binder

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use string_wizard_contract::{DefinitionError, ServiceDefinition};

use super::output::{CheckOutput, DocumentFormat, OutputFormat, RoutesOutput};
use super::ExitCode;
use crate::config::BinderConfig;
use crate::error::CliError;
use crate::manifest::DeploymentManifest;
use crate::table::bind;

/// String Wizard routing binder
///
/// Derives gateway routing configuration from the interface definition and
/// the deployed handler set.
#[derive(Parser, Debug)]
#[command(name = "wizard-bind")]
#[command(about = "Derive gateway routing configuration from an interface definition", long_about = None)]
#[command(version)]
pub struct BindCli {
    /// Output verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: BindCommands,
}

#[derive(Subcommand, Debug)]
pub enum BindCommands {
    /// Bind handlers and emit the deployment manifest
    ///
    /// Fails without writing anything when a declared operation has no
    /// deployed handler.
    Bind {
        /// Interface definition (.json, .yaml); the bundled definition if omitted
        #[arg(short, long, env = "WIZARD_DEFINITION")]
        definition: Option<PathBuf>,

        /// Binder configuration (.toml, .yaml)
        #[arg(short, long, env = "WIZARD_BINDER_CONFIG")]
        config: PathBuf,

        /// Write the manifest here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "json")]
        format: DocumentFormat,
    },

    /// Check that every declared operation has exactly one handler
    Check {
        #[arg(short, long, env = "WIZARD_DEFINITION")]
        definition: Option<PathBuf>,

        #[arg(short, long, env = "WIZARD_BINDER_CONFIG")]
        config: PathBuf,

        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List the bound routing table
    Routes {
        #[arg(short, long, env = "WIZARD_DEFINITION")]
        definition: Option<PathBuf>,

        #[arg(short, long, env = "WIZARD_BINDER_CONFIG")]
        config: PathBuf,

        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

fn load_definition(path: Option<&Path>) -> Result<ServiceDefinition, DefinitionError> {
    match path {
        Some(path) => ServiceDefinition::load(path),
        None => ServiceDefinition::bundled(),
    }
}

pub fn execute_bind(
    definition: Option<PathBuf>,
    config: PathBuf,
    output: Option<PathBuf>,
    format: DocumentFormat,
) -> Result<ExitCode, CliError> {
    let definition = load_definition(definition.as_deref())?;
    let config = BinderConfig::load(&config)?;

    let manifest = DeploymentManifest::build(&definition, &config)?;
    let text = format.encode(&manifest)?;

    match output {
        Some(path) => {
            std::fs::write(&path, text).map_err(|e| {
                CliError::FileError(format!(
                    "Failed to write manifest '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            tracing::info!(
                path = %path.display(),
                routing_fingerprint = %manifest.routing_fingerprint,
                "Wrote deployment manifest"
            );
        }
        None => println!("{}", text),
    }

    Ok(ExitCode::Success)
}

pub fn execute_check(
    definition: Option<PathBuf>,
    config: PathBuf,
    format: OutputFormat,
) -> Result<ExitCode, CliError> {
    let definition = load_definition(definition.as_deref())?;
    let config = BinderConfig::load(&config)?;
    let handlers = config.handler_set()?;

    let missing: Vec<String> = definition
        .operations()
        .filter(|(name, _)| handlers.get(name.as_str()).is_none())
        .map(|(name, _)| name.to_string())
        .collect();
    let undeclared: Vec<String> = handlers
        .iter()
        .filter(|(name, _)| definition.operation(name.as_str()).is_none())
        .map(|(name, _)| name.to_string())
        .collect();

    let output = CheckOutput {
        complete: missing.is_empty() && undeclared.is_empty(),
        missing,
        undeclared,
    };
    output.render(format)?;

    Ok(if output.complete {
        ExitCode::Success
    } else {
        ExitCode::BindingFailure
    })
}

pub fn execute_routes(
    definition: Option<PathBuf>,
    config: PathBuf,
    format: OutputFormat,
) -> Result<ExitCode, CliError> {
    let definition = load_definition(definition.as_deref())?;
    let config = BinderConfig::load(&config)?;
    let table = bind(&definition, &config.handler_set()?)?;

    RoutesOutput::from_table(&table).render(format)?;
    Ok(ExitCode::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        BindCli::command().debug_assert();
    }

    #[test]
    fn test_parse_bind() {
        let cli = BindCli::parse_from([
            "wizard-bind",
            "bind",
            "--config",
            "binder.toml",
            "--format",
            "yaml",
        ]);
        match cli.command {
            BindCommands::Bind {
                definition,
                config,
                output,
                format,
            } => {
                assert!(definition.is_none());
                assert_eq!(config, PathBuf::from("binder.toml"));
                assert!(output.is_none());
                assert_eq!(format, DocumentFormat::Yaml);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
