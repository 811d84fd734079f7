//! String Wizard Routing Binder
//!
//! A build-time transform from the interface definition and the set of
//! deployed handlers to the gateway's routing configuration.
//!
//! ## Pipeline
//!
//! 1. [`HandlerSet`]: operation name to handler address, from configuration
//! 2. [`bind`]: resolves every route of the definition; static routes pass
//!    through, dispatch routes get their handler address, and a missing
//!    handler fails the deployment
//! 3. [`GatewayDocument`], [`TrustPolicy`], [`InvokePermission`]: rendered
//!    from the [`RoutingTable`] and bundled into a [`DeploymentManifest`]
//!
//! ## Example
//!
//! ```rust
//! use string_wizard_binder::{bind, HandlerSet};
//! use string_wizard_contract::ServiceDefinition;
//!
//! let definition = ServiceDefinition::bundled().unwrap();
//! let handlers = HandlerSet::from_raw(vec![
//!     ("Echo", "arn:aws:lambda:us-west-2:123456789012:function:echo"),
//!     ("Length", "arn:aws:lambda:us-west-2:123456789012:function:length"),
//! ])
//! .unwrap();
//!
//! let table = bind(&definition, &handlers).unwrap();
//! assert_eq!(table.dispatch_targets().count(), 2);
//! ```

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod handlers;
pub mod manifest;
pub mod policy;
pub mod table;

pub use cli::{BindCli, BindCommands, ExitCode};
pub use config::{BinderConfig, TrustConfig};
pub use document::{GatewayDocument, InvocationUriTemplate};
pub use error::{BindingError, CliError, ConfigError, ManifestError};
pub use handlers::{HandlerAddress, HandlerSet};
pub use manifest::DeploymentManifest;
pub use policy::{ApiScope, InvokePermission, LoggingLevel, StageSettings, TrustPolicy};
pub use table::{bind, RouteKey, RouteMatch, RouteTarget, RoutingTable};

/// Run the CLI and map failures to exit codes
pub fn run_cli(cli: BindCli) -> ExitCode {
    match cli::run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from_error(&e)
        }
    }
}
