//! Deployment manifest
//!
//! Everything the deployment step consumes, derived in one pass from the
//! interface definition and the binder configuration.

use serde::Serialize;

use string_wizard_contract::ServiceDefinition;

use crate::config::BinderConfig;
use crate::document::GatewayDocument;
use crate::error::ManifestError;
use crate::policy::{InvokePermission, StageSettings, TrustPolicy};
use crate::table::{bind, RoutingTable};

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentManifest {
    pub service: String,
    pub definition_fingerprint: String,
    pub routing_fingerprint: String,
    pub routing: RoutingTable,
    pub gateway: GatewayDocument,
    pub policy: TrustPolicy,
    pub permissions: Vec<InvokePermission>,
    pub stage: StageSettings,
}

impl DeploymentManifest {
    /// Bind and render; fails without emitting anything when binding fails
    /// or the API scope is incomplete
    pub fn build(
        definition: &ServiceDefinition,
        config: &BinderConfig,
    ) -> Result<Self, ManifestError> {
        let handlers = config.handler_set()?;
        let routing = bind(definition, &handlers)?;
        let gateway = GatewayDocument::render(definition, &routing, &config.uri_template());

        let scope = config.scope()?;
        let permissions = routing
            .dispatch_targets()
            .map(|(operation, address)| InvokePermission::new(operation, address, &scope))
            .collect();

        Ok(Self {
            service: definition.service.clone(),
            definition_fingerprint: definition.fingerprint(),
            routing_fingerprint: routing.fingerprint(),
            routing,
            gateway,
            policy: config.trust_policy(),
            permissions,
            stage: config.stage.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BindingError, ConfigError};

    fn config(handlers: &str) -> BinderConfig {
        BinderConfig::from_toml_str(&format!(
            "region = \"us-west-2\"\naccount = \"1\"\napi_id = \"api\"\n[handlers]\n{}",
            handlers
        ))
        .unwrap()
    }

    #[test]
    fn test_manifest_has_one_permission_per_handler() {
        let definition = ServiceDefinition::bundled().unwrap();
        let manifest = DeploymentManifest::build(
            &definition,
            &config("Echo = \"arn:echo\"\nLength = \"arn:length\""),
        )
        .unwrap();

        assert_eq!(manifest.service, "StringWizard");
        assert_eq!(manifest.definition_fingerprint, definition.fingerprint());
        let ids: Vec<&str> = manifest
            .permissions
            .iter()
            .map(|p| p.statement_id.as_str())
            .collect();
        assert_eq!(ids, vec!["EchoPermission", "LengthPermission"]);
        assert!(manifest.policy.is_open());
    }

    #[test]
    fn test_manifest_fails_on_missing_handler() {
        let definition = ServiceDefinition::bundled().unwrap();
        let err = DeploymentManifest::build(&definition, &config("Echo = \"arn:echo\"")).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::Binding(BindingError::MissingHandler { ref operation, .. }) if operation == "Length"
        ));
    }

    #[test]
    fn test_manifest_requires_api_scope() {
        let definition = ServiceDefinition::bundled().unwrap();
        let config = BinderConfig::from_toml_str(
            "region = \"us-west-2\"\n[handlers]\nEcho = \"arn:echo\"\nLength = \"arn:length\"",
        )
        .unwrap();

        let err = DeploymentManifest::build(&definition, &config).unwrap_err();
        assert!(matches!(err, ManifestError::Config(ConfigError::Invalid(_))));
    }
}
