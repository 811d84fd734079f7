//! Gateway document rendering
//!
//! Renders the routing table as an OpenAPI 3 document carrying API Gateway
//! integrations: `aws_proxy` for dispatch routes, `mock` for static routes.
//! Maps are emitted in sorted order so the same inputs always produce the
//! same bytes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use string_wizard_contract::{
    MemberLocation, MemberShape, MemberType, OperationDefinition, ServiceDefinition, Shape,
    StaticResponse,
};

use crate::handlers::HandlerAddress;
use crate::table::{RouteTarget, RoutingTable};

pub const OPENAPI_VERSION: &str = "3.0.2";
pub const INTEGRATION_EXTENSION: &str = "x-amazon-apigateway-integration";

/// Formats the gateway-side URI used to invoke a handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationUriTemplate {
    pub partition: String,
    pub region: String,
}

impl InvocationUriTemplate {
    pub fn new(partition: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            region: region.into(),
        }
    }

    pub fn uri(&self, address: &HandlerAddress) -> String {
        format!(
            "arn:{}:apigateway:{}:lambda:path/2015-03-31/functions/{}/invocations",
            self.partition, self.region, address
        )
    }
}

/// Rendered OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayDocument(Value);

impl GatewayDocument {
    pub fn render(
        definition: &ServiceDefinition,
        table: &RoutingTable,
        uris: &InvocationUriTemplate,
    ) -> Self {
        let mut paths: Map<String, Value> = Map::new();

        for (key, target) in table.routes() {
            let item = match target {
                RouteTarget::Dispatch { operation, address } => {
                    match definition.operation(operation.as_str()) {
                        Some(op) => dispatch_item(definition, operation.as_str(), op, &uris.uri(address)),
                        None => continue,
                    }
                }
                RouteTarget::Static(response) => static_item(response),
            };

            let entry = paths
                .entry(key.path.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(methods) = entry {
                methods.insert(key.method.openapi_key(), item);
            }
        }

        let schemas: Map<String, Value> = definition
            .shapes
            .iter()
            .map(|(name, shape)| (name.clone(), shape_schema(shape, false)))
            .collect();

        GatewayDocument(json!({
            "openapi": OPENAPI_VERSION,
            "info": {
                "title": definition.service,
                "version": definition.version,
            },
            "paths": paths,
            "components": { "schemas": schemas },
        }))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// The integration object of one path item, if present
    pub fn integration(&self, path: &str, method: &str) -> Option<&Value> {
        self.0
            .get("paths")?
            .get(path)?
            .get(method.to_lowercase())?
            .get(INTEGRATION_EXTENSION)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.0)
    }
}

fn dispatch_item(
    definition: &ServiceDefinition,
    name: &str,
    op: &OperationDefinition,
    uri: &str,
) -> Value {
    let mut item = Map::new();
    item.insert("operationId".into(), json!(name));
    if let Some(doc) = &op.documentation {
        item.insert("description".into(), json!(doc));
    }

    if let Some(input) = definition.shape(&op.input) {
        let parameters: Vec<Value> = input
            .members
            .iter()
            .filter_map(|(member_name, member)| {
                let location = match member.location {
                    MemberLocation::Label => "path",
                    MemberLocation::Query => "query",
                    MemberLocation::Body => return None,
                };
                Some(json!({
                    "name": member_name,
                    "in": location,
                    "required": member.required || member.location == MemberLocation::Label,
                    "schema": member_schema(member),
                }))
            })
            .collect();
        if !parameters.is_empty() {
            item.insert("parameters".into(), Value::Array(parameters));
        }

        let has_body = input
            .members
            .values()
            .any(|m| m.location == MemberLocation::Body);
        if has_body {
            item.insert(
                "requestBody".into(),
                json!({
                    "required": true,
                    "content": {
                        "application/json": { "schema": shape_schema(input, true) }
                    }
                }),
            );
        }
    }

    let mut responses = Map::new();
    responses.insert(
        op.http.code.to_string(),
        json!({
            "description": format!("{} {} response", name, op.http.code),
            "content": {
                "application/json": { "schema": schema_ref(&op.output) }
            }
        }),
    );
    for error in &op.errors {
        let status = definition
            .shape(error)
            .map(Shape::error_status)
            .unwrap_or(400)
            .to_string();
        let refs = json!({ "$ref": format!("#/components/schemas/{}", error) });
        match responses.get_mut(&status) {
            // Several errors on one status collapse into a oneOf
            Some(existing) => {
                if let Some(schema) = existing.pointer_mut("/content/application~1json/schema") {
                    let mut variants = match schema.get("oneOf").and_then(Value::as_array) {
                        Some(list) => list.clone(),
                        None => vec![schema.clone()],
                    };
                    variants.push(refs);
                    *schema = json!({ "oneOf": variants });
                }
            }
            None => {
                responses.insert(
                    status,
                    json!({
                        "description": format!("{} error response", error),
                        "content": { "application/json": { "schema": refs } }
                    }),
                );
            }
        }
    }
    item.insert("responses".into(), Value::Object(responses));

    item.insert(
        INTEGRATION_EXTENSION.into(),
        json!({
            "type": "aws_proxy",
            "httpMethod": "POST",
            "uri": uri,
        }),
    );
    Value::Object(item)
}

fn static_item(response: &StaticResponse) -> Value {
    let status = response.status.to_string();

    let response_parameters: Map<String, Value> = response
        .headers
        .iter()
        .map(|(name, value)| {
            (
                format!("method.response.header.{}", name),
                json!(format!("'{}'", value)),
            )
        })
        .collect();
    let header_docs: Map<String, Value> = response
        .headers
        .keys()
        .map(|name| (name.clone(), json!({ "schema": { "type": "string" } })))
        .collect();

    let mut integration_response = Map::new();
    integration_response.insert("statusCode".into(), json!(status));
    if !response_parameters.is_empty() {
        integration_response.insert("responseParameters".into(), Value::Object(response_parameters));
    }
    if let Some(body) = &response.body {
        integration_response.insert(
            "responseTemplates".into(),
            json!({ "application/json": body.to_string() }),
        );
    }

    let mut method_response = Map::new();
    method_response.insert("description".into(), json!(format!("{} response", status)));
    if !header_docs.is_empty() {
        method_response.insert("headers".into(), Value::Object(header_docs));
    }

    json!({
        "responses": { status.clone(): method_response },
        INTEGRATION_EXTENSION: {
            "type": "mock",
            "requestTemplates": {
                "application/json": format!("{{\"statusCode\": {}}}", status)
            },
            "responses": { "default": integration_response },
        }
    })
}

fn schema_ref(shape: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{}", shape) })
}

/// JSON schema of a shape; `body_only` keeps just body members
fn shape_schema(shape: &Shape, body_only: bool) -> Value {
    let members = shape
        .members
        .iter()
        .filter(|(_, m)| !body_only || m.location == MemberLocation::Body);

    let mut properties = Map::new();
    let mut required = Vec::new();
    for (name, member) in members {
        properties.insert(name.clone(), member_schema(member));
        if member.required {
            required.push(json!(name));
        }
    }

    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".into(), Value::Array(required));
    }
    if let Some(doc) = &shape.documentation {
        schema.insert("description".into(), json!(doc));
    }
    Value::Object(schema)
}

fn member_schema(member: &MemberShape) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), json!(member.member_type.as_str()));
    if member.member_type == MemberType::String {
        if let Some(pattern) = &member.pattern {
            schema.insert("pattern".into(), json!(pattern));
        }
        if let Some(min) = member.min_length {
            schema.insert("minLength".into(), json!(min));
        }
        if let Some(max) = member.max_length {
            schema.insert("maxLength".into(), json!(max));
        }
    }
    Value::Object(schema)
}
