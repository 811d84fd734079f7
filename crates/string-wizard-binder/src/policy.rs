//! Trust policy, invoke permissions and stage settings
//!
//! These are emitted as configuration for the deployment step; nothing here
//! is enforced by the binder itself.

use serde::{Deserialize, Serialize};

use string_wizard_contract::OperationName;

use crate::handlers::HandlerAddress;

pub const INVOKE_ACTION: &str = "execute-api:Invoke";
pub const ANY_API_RESOURCE: &str = "execute-api:/*/*/*";
pub const GATEWAY_SERVICE_PRINCIPAL: &str = "apigateway.amazonaws.com";
const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// Principal of a policy statement: `"*"` or a list of AWS principals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Principal {
    Any(String),
    Aws {
        #[serde(rename = "AWS")]
        aws: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: Effect,
    pub principal: Principal,
    pub action: Vec<String>,
    pub resource: Vec<String>,
}

/// Who may invoke the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrustPolicy {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

impl TrustPolicy {
    /// Any caller may invoke any operation
    pub fn open() -> Self {
        Self::allow(Principal::Any("*".to_string()))
    }

    /// Only the listed principals may invoke; principals are sorted and
    /// deduplicated
    pub fn restricted<I, S>(principals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut aws: Vec<String> = principals.into_iter().map(Into::into).collect();
        aws.sort();
        aws.dedup();
        Self::allow(Principal::Aws { aws })
    }

    fn allow(principal: Principal) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![PolicyStatement {
                effect: Effect::Allow,
                principal,
                action: vec![INVOKE_ACTION.to_string()],
                resource: vec![ANY_API_RESOURCE.to_string()],
            }],
        }
    }

    /// Whether any principal is allowed
    pub fn is_open(&self) -> bool {
        self.statement
            .iter()
            .any(|s| s.effect == Effect::Allow && s.principal == Principal::Any("*".to_string()))
    }
}

/// Permission for the gateway to invoke one handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokePermission {
    /// Statement id, `<Operation>Permission`
    pub statement_id: String,
    pub operation: OperationName,
    pub function: HandlerAddress,
    pub principal: String,
    pub source_arn: String,
}

/// Where the API will live, used to scope invoke permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiScope {
    pub partition: String,
    pub region: String,
    pub account: String,
    pub api_id: String,
}

impl ApiScope {
    pub fn source_arn(&self) -> String {
        format!(
            "arn:{}:execute-api:{}:{}:{}/*/*/*",
            self.partition, self.region, self.account, self.api_id
        )
    }
}

impl InvokePermission {
    pub fn new(operation: &OperationName, function: &HandlerAddress, scope: &ApiScope) -> Self {
        Self {
            statement_id: format!("{}Permission", operation),
            operation: operation.clone(),
            function: function.clone(),
            principal: GATEWAY_SERVICE_PRINCIPAL.to_string(),
            source_arn: scope.source_arn(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoggingLevel {
    Off,
    Error,
    #[default]
    Info,
}

/// Deployment stage options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSettings {
    #[serde(default = "default_stage_name")]
    pub name: String,
    #[serde(default)]
    pub logging_level: LoggingLevel,
    #[serde(default = "default_true")]
    pub data_trace_enabled: bool,
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
}

fn default_stage_name() -> String {
    "prod".to_string()
}

fn default_true() -> bool {
    true
}

fn default_access_log_format() -> String {
    "json_with_standard_fields".to_string()
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            name: default_stage_name(),
            logging_level: LoggingLevel::default(),
            data_trace_enabled: true,
            metrics_enabled: true,
            access_log_format: default_access_log_format(),
        }
    }
}
