//! HTTP front that applies a routing table
//!
//! Every request goes through the same pipeline: caller trust check, route
//! lookup, body limit, JSON parsing, then dispatch under the configured
//! deadline. Static routes answer with their fixed response. Two internal
//! endpoints sit beside the bound routes:
//! - GET /_gateway/health - Routing table summary
//! - GET /_gateway/metrics - Prometheus text exposition

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use string_wizard_binder::{bind, RouteTarget, RoutingTable};
use string_wizard_contract::{HttpMethod, OperationName, RawRequest, ServiceDefinition};
use string_wizard_handlers::{
    string_wizard_dispatcher, CallerIdentity, DispatchError, Dispatcher, InvocationContext,
};

use crate::config::GatewayConfig;
use crate::directory::HandlerDirectory;
use crate::error::{GatewayError, RequestError};
use crate::metrics::GatewayMetrics;
use crate::response::{self, REQUEST_ID_HEADER};

pub const HEALTH_PATH: &str = "/_gateway/health";
pub const METRICS_PATH: &str = "/_gateway/metrics";

/// Fields of a request routed to an operation
struct RequestParts<'a> {
    labels: BTreeMap<String, String>,
    query: HashMap<String, String>,
    headers: &'a HeaderMap,
    body: Body,
}

/// Dispatcher and success code resolved for one operation
struct BoundOperation {
    dispatcher: Arc<Dispatcher>,
    success_code: u16,
}

struct GatewayInner {
    table: RoutingTable,
    operations: BTreeMap<OperationName, BoundOperation>,
    config: GatewayConfig,
    metrics: GatewayMetrics,
    started_at: DateTime<Utc>,
}

/// A routing table bound to live dispatchers
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

impl Gateway {
    /// Resolve every dispatch target of `table` through `directory`
    ///
    /// Fails if a target address is unknown or its dispatcher does not
    /// handle the routed operation.
    pub fn new(
        table: RoutingTable,
        directory: &HandlerDirectory,
        config: GatewayConfig,
    ) -> Result<Self, GatewayError> {
        let mut operations = BTreeMap::new();

        for (operation, address) in table.dispatch_targets() {
            let unresolved = || GatewayError::UnresolvedTarget {
                operation: operation.to_string(),
                address: address.to_string(),
            };

            let dispatcher = directory
                .resolve(address)
                .filter(|d| d.handles(operation.as_str()))
                .ok_or_else(unresolved)?;
            let success_code = dispatcher
                .definition()
                .operation(operation.as_str())
                .map(|op| op.http.code)
                .ok_or_else(unresolved)?;

            operations.insert(
                operation.clone(),
                BoundOperation {
                    dispatcher: Arc::clone(dispatcher),
                    success_code,
                },
            );
        }

        tracing::info!(
            service = %table.service(),
            routes = table.len(),
            operations = operations.len(),
            trust = ?config.trust,
            "Gateway assembled"
        );

        Ok(Self {
            inner: Arc::new(GatewayInner {
                table,
                operations,
                config,
                metrics: GatewayMetrics::new()?,
                started_at: Utc::now(),
            }),
        })
    }

    pub fn table(&self) -> &RoutingTable {
        &self.inner.table
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.inner.metrics
    }

    /// Build the axum router serving this gateway
    pub fn router(&self) -> Router {
        Router::new()
            .route(HEALTH_PATH, get(health_check))
            .route(METRICS_PATH, get(metrics_text))
            .fallback(route_request)
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    async fn handle(
        &self,
        method: Method,
        uri: Uri,
        query: HashMap<String, String>,
        headers: HeaderMap,
        body: Body,
    ) -> Response {
        let start = Instant::now();
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let caller = CallerIdentity::from_header(
            headers
                .get(self.inner.config.caller_header.as_str())
                .and_then(|v| v.to_str().ok()),
        );

        let path = uri.path().to_string();
        let route = method
            .as_str()
            .parse::<HttpMethod>()
            .ok()
            .and_then(|m| self.inner.table.lookup(m, &path));
        let label = match route.as_ref().map(|r| r.target) {
            Some(RouteTarget::Dispatch { operation, .. }) => operation.as_str().to_string(),
            Some(RouteTarget::Static(_)) => "static".to_string(),
            None => "unmatched".to_string(),
        };

        let response = if !self.inner.config.permits(caller.principal()) {
            tracing::warn!(
                request_id = %request_id,
                caller = %caller,
                method = %method,
                path = %path,
                "Caller rejected by trust policy"
            );
            self.reject(&label, RequestError::AccessDenied, &request_id)
        } else {
            let unknown = || RequestError::UnknownRoute {
                method: method.to_string(),
                path: path.clone(),
            };
            match route {
                None => self.reject(&label, unknown(), &request_id),
                Some(matched) => match matched.target {
                    RouteTarget::Static(fixed) => response::static_route(fixed, &request_id),
                    RouteTarget::Dispatch { operation, .. } => {
                        match self.inner.operations.get(operation) {
                            None => self.reject(&label, unknown(), &request_id),
                            Some(bound) => {
                                let ctx = InvocationContext::new(caller)
                                    .with_request_id(request_id.clone())
                                    .with_timeout(self.inner.config.timeout());
                                let request = RequestParts {
                                    labels: matched.labels,
                                    query,
                                    headers: &headers,
                                    body,
                                };
                                match self.dispatch(operation, bound, request, &ctx).await {
                                    Ok(response) => response,
                                    Err(err) => self.reject(&label, err, &request_id),
                                }
                            }
                        }
                    }
                },
            }
        };

        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            route = %label,
            status = response.status().as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );

        response
    }

    async fn dispatch(
        &self,
        operation: &OperationName,
        bound: &BoundOperation,
        parts: RequestParts<'_>,
        ctx: &InvocationContext,
    ) -> Result<Response, RequestError> {
        let limit = self.inner.config.max_body_size;
        let declared_length = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared_length.is_some_and(|len| len > limit) {
            return Err(RequestError::BodyTooLarge { limit });
        }
        let bytes = axum::body::to_bytes(parts.body, limit)
            .await
            .map_err(|_| RequestError::BodyTooLarge { limit })?;

        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(
                serde_json::from_slice::<Value>(&bytes)
                    .map_err(|e| RequestError::Serialization(e.to_string()))?,
            )
        };

        let mut request = RawRequest::new();
        for (name, raw) in parts.labels {
            let value = urlencoding::decode(&raw)
                .map_err(|_| {
                    RequestError::Serialization(format!("path label '{}' is not valid UTF-8", name))
                })?
                .into_owned();
            request.labels.insert(name, value);
        }
        request.query = parts.query.into_iter().collect();
        request.body = body;

        let metrics = &self.inner.metrics;
        let timer = metrics.start_invocation(operation.as_str());
        let outcome = tokio::time::timeout(
            self.inner.config.timeout(),
            bound.dispatcher.invoke(operation.as_str(), &request, ctx),
        )
        .await;
        drop(timer);

        let response = match outcome {
            Err(_) => {
                tracing::error!(
                    request_id = %ctx.request_id,
                    operation = %operation,
                    timeout_ms = self.inner.config.timeout_ms,
                    "Invocation timed out"
                );
                return Err(RequestError::Timeout(self.inner.config.timeout_ms));
            }
            Ok(Ok(output)) => {
                metrics.record_outcome(operation.as_str(), "success");
                response::success(bound.success_code, output, &ctx.request_id)
            }
            Ok(Err(err)) => {
                metrics.record_outcome(operation.as_str(), dispatch_outcome(&err));
                response::dispatch_error(&err, &ctx.request_id)
            }
        };
        Ok(response)
    }

    fn reject(&self, route: &str, err: RequestError, request_id: &str) -> Response {
        self.inner.metrics.record_outcome(route, err.outcome());
        tracing::debug!(
            request_id = %request_id,
            error_type = err.error_type(),
            error = %err,
            "Request rejected"
        );
        response::request_error(&err, request_id)
    }
}

fn dispatch_outcome(err: &DispatchError) -> &'static str {
    match err {
        DispatchError::Validation(_) => "validation_error",
        DispatchError::Typed(_) => "typed_error",
        DispatchError::Fault { .. } => "fault",
    }
}

/// Assemble a gateway serving the bundled String Wizard operations in-process
///
/// Handlers are registered under `local://<operation>` addresses and bound
/// with the same binder used for deployment manifests.
pub fn local_gateway(
    definition: Arc<ServiceDefinition>,
    config: GatewayConfig,
) -> Result<Gateway, GatewayError> {
    let dispatcher = Arc::new(string_wizard_dispatcher(Arc::clone(&definition))?);
    let mut directory = HandlerDirectory::new();
    let handlers = directory.register_local(dispatcher)?;
    let table = bind(&definition, &handlers)?;
    Gateway::new(table, &directory, config)
}

async fn route_request(
    State(gateway): State<Gateway>,
    method: Method,
    uri: Uri,
    query: Option<Query<HashMap<String, String>>>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    gateway.handle(method, uri, query, headers, body).await
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub version: &'static str,
    pub routes: usize,
    pub operations: Vec<String>,
    pub routing_fingerprint: String,
    pub started_at: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

/// GET /_gateway/health
async fn health_check(State(gateway): State<Gateway>) -> Json<HealthResponse> {
    let inner = &gateway.inner;
    Json(HealthResponse {
        status: "healthy",
        service: inner.table.service().to_string(),
        version: env!("CARGO_PKG_VERSION"),
        routes: inner.table.len(),
        operations: inner.operations.keys().map(|o| o.to_string()).collect(),
        routing_fingerprint: inner.table.fingerprint(),
        started_at: inner.started_at,
        timestamp: Utc::now(),
    })
}

/// GET /_gateway/metrics
async fn metrics_text(State(gateway): State<Gateway>) -> Response {
    match gateway.inner.metrics.render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use string_wizard_binder::{HandlerAddress, HandlerSet};

    fn definition() -> Arc<ServiceDefinition> {
        Arc::new(ServiceDefinition::bundled().unwrap())
    }

    #[test]
    fn test_local_gateway_binds_every_operation() {
        let gateway = local_gateway(definition(), GatewayConfig::default()).unwrap();
        assert_eq!(gateway.table().len(), 4);
        assert_eq!(gateway.inner.operations.len(), 2);
        assert_eq!(gateway.inner.operations["Echo"].success_code, 200);
    }

    #[test]
    fn test_unresolved_target_is_rejected() {
        let definition = definition();
        let handlers = HandlerSet::from_raw([
            ("Echo", "arn:aws:lambda:us-east-1:123456789012:function:echo"),
            ("Length", "arn:aws:lambda:us-east-1:123456789012:function:length"),
        ])
        .unwrap();
        let table = bind(&definition, &handlers).unwrap();

        let err = Gateway::new(table, &HandlerDirectory::new(), GatewayConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, GatewayError::UnresolvedTarget { .. }));
    }

    #[test]
    fn test_shared_address_serves_both_operations() {
        let definition = definition();
        let dispatcher = Arc::new(string_wizard_dispatcher(Arc::clone(&definition)).unwrap());
        let shared = HandlerAddress::new("local://shared").unwrap();
        let mut directory = HandlerDirectory::new();
        directory.register(shared.clone(), dispatcher);

        let handlers = HandlerSet::from_raw([("Echo", "local://shared"), ("Length", "local://shared")])
            .unwrap();
        let table = bind(&definition, &handlers).unwrap();
        assert!(Gateway::new(table, &directory, GatewayConfig::default()).is_ok());
    }
}
