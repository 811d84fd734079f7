//! `wizard-bind` command-line interface

pub mod commands;
pub mod output;

pub use commands::{BindCli, BindCommands};
pub use output::{DocumentFormat, OutputFormat};

use string_wizard_contract::DefinitionError;

use crate::error::{CliError, ConfigError};

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    /// Invalid definition, configuration or arguments
    InvalidInput = 3,
    /// File not found or inaccessible
    FileError = 4,
    /// A declared operation could not be bound to a handler
    BindingFailure = 6,
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    pub fn from_error(err: &CliError) -> Self {
        match err {
            CliError::InvalidInput(_) => ExitCode::InvalidInput,
            CliError::FileError(_)
            | CliError::Definition(DefinitionError::FileError(_))
            | CliError::Config(ConfigError::FileError(_)) => ExitCode::FileError,
            CliError::Definition(_) | CliError::Config(_) => ExitCode::InvalidInput,
            CliError::Binding(_) => ExitCode::BindingFailure,
            CliError::SerializationError(_) => ExitCode::InternalError,
        }
    }
}

pub fn run(cli: BindCli) -> Result<ExitCode, CliError> {
    match cli.command {
        BindCommands::Bind {
            definition,
            config,
            output,
            format,
        } => commands::execute_bind(definition, config, output, format),
        BindCommands::Check {
            definition,
            config,
            format,
        } => commands::execute_check(definition, config, format),
        BindCommands::Routes {
            definition,
            config,
            format,
        } => commands::execute_routes(definition, config, format),
    }
}
