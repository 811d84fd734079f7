//! Routing table and the binder transform
//!
//! [`bind`] is a pure function over the interface definition and the
//! deployed handler set. Both inputs are ordered maps, so the resulting
//! table does not depend on the order in which either was assembled.

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

use string_wizard_contract::{
    HttpMethod, OperationName, PathTemplate, RouteBinding, ServiceDefinition, StaticResponse,
};

use crate::error::BindingError;
use crate::handlers::{HandlerAddress, HandlerSet};

/// Path+method key of a route, ordered by path then method
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RouteKey {
    pub path: PathTemplate,
    pub method: HttpMethod,
}

/// Where a route goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteTarget {
    /// Invoke the handler deployed at `address`
    Dispatch {
        operation: OperationName,
        address: HandlerAddress,
    },
    /// Answer with a fixed response
    Static(StaticResponse),
}

/// A route resolved for a concrete request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub key: &'a RouteKey,
    pub target: &'a RouteTarget,
    pub labels: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct RouteRecord<'a> {
    method: HttpMethod,
    path: &'a PathTemplate,
    #[serde(flatten)]
    target: &'a RouteTarget,
}

/// Read-only routing configuration derived by [`bind`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    service: String,
    routes: BTreeMap<RouteKey, RouteTarget>,
}

impl RoutingTable {
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn routes(&self) -> impl Iterator<Item = (&RouteKey, &RouteTarget)> {
        self.routes.iter()
    }

    pub fn get(&self, method: HttpMethod, path: &PathTemplate) -> Option<&RouteTarget> {
        self.routes.get(&RouteKey {
            path: path.clone(),
            method,
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolve a concrete request path. Literal segments win over labels
    /// when more than one template matches.
    pub fn lookup(&self, method: HttpMethod, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|(key, _)| key.method == method)
            .filter_map(|(key, target)| {
                key.path.matches(path).map(|labels| RouteMatch {
                    key,
                    target,
                    labels,
                })
            })
            .min_by_key(|m| m.labels.len())
    }

    /// Operation to handler address for every dispatch route, in route order
    pub fn dispatch_targets(&self) -> impl Iterator<Item = (&OperationName, &HandlerAddress)> {
        self.routes.values().filter_map(|target| match target {
            RouteTarget::Dispatch { operation, address } => Some((operation, address)),
            RouteTarget::Static(_) => None,
        })
    }

    /// SHA-256 digest of the canonical JSON form
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&canonical))
    }

    fn records(&self) -> impl Iterator<Item = RouteRecord<'_>> {
        self.routes.iter().map(|(key, target)| RouteRecord {
            method: key.method,
            path: &key.path,
            target,
        })
    }
}

impl Serialize for RoutingTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Document<'a> {
            service: &'a str,
            routes: Vec<RouteRecord<'a>>,
        }

        Document {
            service: &self.service,
            routes: self.records().collect(),
        }
        .serialize(serializer)
    }
}

/// Bind every route of `definition` to its target
///
/// Static routes pass through unchanged. Every dispatch route must have a
/// handler in `handlers`, and every handler must belong to a declared
/// operation; otherwise binding fails and no table is produced.
pub fn bind(
    definition: &ServiceDefinition,
    handlers: &HandlerSet,
) -> Result<RoutingTable, BindingError> {
    for (operation, _) in handlers.iter() {
        if definition.operation(operation.as_str()).is_none() {
            return Err(BindingError::UndeclaredOperation(operation.to_string()));
        }
    }

    let mut routes = BTreeMap::new();
    let mut bound = BTreeSet::new();
    for entry in definition.route_entries() {
        let target = match entry.binding {
            RouteBinding::Static(response) => RouteTarget::Static(response),
            RouteBinding::Dispatch { operation } => {
                let address = handlers.get(operation.as_str()).cloned().ok_or_else(|| {
                    BindingError::MissingHandler {
                        operation: operation.to_string(),
                        method: entry.method.to_string(),
                        path: entry.path.to_string(),
                    }
                })?;
                bound.insert(operation.clone());
                RouteTarget::Dispatch { operation, address }
            }
        };

        routes.insert(
            RouteKey {
                path: entry.path,
                method: entry.method,
            },
            target,
        );
    }

    tracing::info!(
        service = %definition.service,
        routes = routes.len(),
        dispatch = bound.len(),
        "Bound routing table"
    );

    Ok(RoutingTable {
        service: definition.service.clone(),
        routes,
    })
}
