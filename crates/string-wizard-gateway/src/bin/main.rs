//! `wizard-gateway`: serve the String Wizard operations over HTTP
//!
//! Configuration is layered: defaults, then `--config`, then `WIZARD_*`
//! environment variables, then `--bind`.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use string_wizard_contract::ServiceDefinition;
use string_wizard_gateway::{local_gateway, GatewayConfig};

#[derive(Parser)]
#[command(name = "wizard-gateway")]
#[command(about = "Local gateway front for the String Wizard service")]
#[command(version)]
struct Cli {
    /// Service definition (JSON or YAML); the bundled definition when omitted
    #[arg(short, long, env = "WIZARD_DEFINITION")]
    definition: Option<PathBuf>,

    /// Gateway configuration file (TOML)
    #[arg(short, long, env = "WIZARD_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let cli = Cli::parse();

    let definition = match &cli.definition {
        Some(path) => ServiceDefinition::load(path)?,
        None => ServiceDefinition::bundled()?,
    };

    let config = match &cli.config {
        Some(path) => GatewayConfig::load(path)?,
        None => GatewayConfig::default(),
    };
    let mut config = config.with_overrides(|key| std::env::var(key).ok())?;
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }

    let gateway = local_gateway(Arc::new(definition), config)?;
    let addr = gateway.config().bind_address.clone();

    tracing::info!(
        service = %gateway.table().service(),
        routes = gateway.table().len(),
        routing_fingerprint = %gateway.table().fingerprint(),
        "Starting gateway on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, gateway.router())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
}
