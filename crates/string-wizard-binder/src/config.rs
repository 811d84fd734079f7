//! Binder configuration
//!
//! Deployment facts the binder needs besides the interface definition:
//! where the API lives, where each handler was deployed, who may call it.
//!
//! ```toml
//! partition = "aws"
//! region = "us-west-2"
//! account = "123456789012"
//! api_id = "a1b2c3"
//! trust = "open"
//!
//! [handlers]
//! Echo = "arn:aws:lambda:us-west-2:123456789012:function:echo"
//! Length = "arn:aws:lambda:us-west-2:123456789012:function:length"
//!
//! [stage]
//! name = "prod"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::document::InvocationUriTemplate;
use crate::error::{BindingError, ConfigError};
use crate::handlers::HandlerSet;
use crate::policy::{ApiScope, StageSettings, TrustPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustKeyword {
    Open,
}

/// `trust = "open"` or `trust = ["arn:...", ...]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrustConfig {
    Keyword(TrustKeyword),
    Principals(Vec<String>),
}

impl Default for TrustConfig {
    fn default() -> Self {
        TrustConfig::Keyword(TrustKeyword::Open)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinderConfig {
    #[serde(default = "default_partition")]
    pub partition: String,
    pub region: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub api_id: String,
    /// Operation name to deployed handler address
    #[serde(default)]
    pub handlers: BTreeMap<String, String>,
    #[serde(default)]
    pub trust: TrustConfig,
    #[serde(default)]
    pub stage: StageSettings,
}

fn default_partition() -> String {
    "aws".to_string()
}

impl BinderConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a `.toml`, `.yaml` or `.yml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::FileError(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "toml" => Self::from_toml_str(&content),
            "yaml" | "yml" => Self::from_yaml_str(&content),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.partition.trim().is_empty() {
            return Err(ConfigError::Invalid("partition must not be empty".into()));
        }
        if self.region.trim().is_empty() {
            return Err(ConfigError::Invalid("region must not be empty".into()));
        }
        if let TrustConfig::Principals(principals) = &self.trust {
            if principals.is_empty() {
                return Err(ConfigError::Invalid(
                    "trust must be \"open\" or a non-empty list of principals".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn handler_set(&self) -> Result<HandlerSet, BindingError> {
        HandlerSet::from_raw(&self.handlers)
    }

    pub fn uri_template(&self) -> InvocationUriTemplate {
        InvocationUriTemplate::new(&self.partition, &self.region)
    }

    /// API location for invoke permissions; `account` and `api_id` are
    /// required here even though binding alone does not need them
    pub fn scope(&self) -> Result<ApiScope, ConfigError> {
        for (field, value) in [("account", &self.account), ("api_id", &self.api_id)] {
            if value.trim().is_empty() || value.chars().any(char::is_whitespace) {
                return Err(ConfigError::Invalid(format!(
                    "{} is required to scope invoke permissions",
                    field
                )));
            }
        }
        Ok(ApiScope {
            partition: self.partition.clone(),
            region: self.region.clone(),
            account: self.account.clone(),
            api_id: self.api_id.clone(),
        })
    }

    pub fn trust_policy(&self) -> TrustPolicy {
        match &self.trust {
            TrustConfig::Keyword(TrustKeyword::Open) => TrustPolicy::open(),
            TrustConfig::Principals(principals) => TrustPolicy::restricted(principals.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML: &str = r#"
region = "us-west-2"
account = "123456789012"
api_id = "a1b2c3"

[handlers]
Echo = "arn:echo"
Length = "arn:length"
"#;

    #[test]
    fn test_toml_defaults() {
        let config = BinderConfig::from_toml_str(TOML).unwrap();
        assert_eq!(config.partition, "aws");
        assert_eq!(config.trust, TrustConfig::default());
        assert!(config.trust_policy().is_open());
        assert_eq!(config.stage, StageSettings::default());
        assert_eq!(config.handler_set().unwrap().len(), 2);
    }

    #[test]
    fn test_yaml_restricted_trust() {
        let yaml = r#"
region: eu-west-1
trust:
  - arn:aws:iam::111:root
handlers:
  Echo: arn:echo
"#;
        let config = BinderConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(
            config.trust,
            TrustConfig::Principals(vec!["arn:aws:iam::111:root".to_string()])
        );
        assert!(!config.trust_policy().is_open());
    }

    #[test]
    fn test_empty_region_is_invalid() {
        let err = BinderConfig::from_toml_str("region = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_empty_principal_list_is_invalid() {
        let err = BinderConfig::from_toml_str("region = \"x\"\ntrust = []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_scope_requires_account_and_api_id() {
        let config = BinderConfig::from_toml_str("region = \"us-west-2\"").unwrap();
        let err = config.scope().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("account")));

        let config =
            BinderConfig::from_toml_str("region = \"us-west-2\"\naccount = \"123456789012\"")
                .unwrap();
        let err = config.scope().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("api_id")));
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binder.ini");
        std::fs::write(&path, TOML).unwrap();
        assert!(matches!(
            BinderConfig::load(&path),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[test]
    fn test_load_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binder.toml");
        std::fs::write(&path, TOML).unwrap();
        let config = BinderConfig::load(&path).unwrap();
        assert_eq!(config.scope().unwrap().source_arn(), "arn:aws:execute-api:us-west-2:123456789012:a1b2c3/*/*/*");
    }
}
