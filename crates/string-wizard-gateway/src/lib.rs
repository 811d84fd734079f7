//! # String Wizard Gateway
//!
//! Local stand-in for the managed API gateway. It applies a bound
//! [`RoutingTable`](string_wizard_binder::RoutingTable) over HTTP: dispatch
//! routes reach their handlers through a [`HandlerDirectory`], static routes
//! answer with their fixed response.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use string_wizard_contract::ServiceDefinition;
//! use string_wizard_gateway::{local_gateway, GatewayConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let definition = Arc::new(ServiceDefinition::bundled()?);
//! let gateway = local_gateway(definition, GatewayConfig::default())?;
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, gateway.router()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod response;

pub use config::{GatewayConfig, TrustMode};
pub use directory::HandlerDirectory;
pub use error::{GatewayError, RequestError};
pub use gateway::{local_gateway, Gateway, HealthResponse, HEALTH_PATH, METRICS_PATH};
pub use metrics::GatewayMetrics;
pub use response::{ERROR_TYPE_HEADER, REQUEST_ID_HEADER};
