//! Gateway configuration
//!
//! Defaults, then an optional TOML file, then `WIZARD_*` environment
//! variables, then command-line flags.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::GatewayError;

/// Who may invoke the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrustMode {
    /// Any caller, including anonymous ones
    #[default]
    Open,
    /// Only callers listed in `allowed_callers`
    Restricted,
}

impl std::str::FromStr for TrustMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(TrustMode::Open),
            "restricted" => Ok(TrustMode::Restricted),
            other => Err(format!("Unknown trust mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Per-invocation deadline in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    #[serde(default)]
    pub trust: TrustMode,
    #[serde(default)]
    pub allowed_callers: Vec<String>,
    /// Header carrying the caller identity
    #[serde(default = "default_caller_header")]
    pub caller_header: String,
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_timeout_ms() -> u64 {
    29000
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

fn default_caller_header() -> String {
    "x-caller-id".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            timeout_ms: default_timeout_ms(),
            max_body_size: default_max_body_size(),
            trust: TrustMode::default(),
            allowed_callers: Vec::new(),
            caller_header: default_caller_header(),
        }
    }
}

impl GatewayConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, GatewayError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| GatewayError::Config(format!("TOML error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults overridden by `WIZARD_*` environment variables
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `WIZARD_*` overrides read through `lookup`
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let invalid = |key: &str, value: &str| {
            GatewayError::Config(format!("Invalid value '{}' for {}", value, key))
        };

        if let Some(bind) = lookup("WIZARD_BIND") {
            self.bind_address = bind;
        }
        if let Some(v) = lookup("WIZARD_TIMEOUT_MS") {
            self.timeout_ms = v.parse().map_err(|_| invalid("WIZARD_TIMEOUT_MS", &v))?;
        }
        if let Some(v) = lookup("WIZARD_MAX_BODY_BYTES") {
            self.max_body_size = v.parse().map_err(|_| invalid("WIZARD_MAX_BODY_BYTES", &v))?;
        }
        if let Some(v) = lookup("WIZARD_TRUST") {
            self.trust = v.parse().map_err(|_| invalid("WIZARD_TRUST", &v))?;
        }
        if let Some(v) = lookup("WIZARD_ALLOWED_CALLERS") {
            self.allowed_callers = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = lookup("WIZARD_CALLER_HEADER") {
            self.caller_header = v;
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), GatewayError> {
        if self.timeout_ms == 0 {
            return Err(GatewayError::Config("timeout_ms must be positive".into()));
        }
        if axum::http::HeaderName::from_bytes(self.caller_header.as_bytes()).is_err() {
            return Err(GatewayError::Config(format!(
                "caller_header '{}' is not a valid header name",
                self.caller_header
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whether `principal` passes the trust policy
    pub fn permits(&self, principal: Option<&str>) -> bool {
        match self.trust {
            TrustMode::Open => true,
            TrustMode::Restricted => {
                principal.is_some_and(|p| self.allowed_callers.iter().any(|a| a == p))
            }
        }
    }
}
