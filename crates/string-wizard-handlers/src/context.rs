//! Per-invocation context
//!
//! Every handler receives an explicit [`InvocationContext`]. Nothing about the
//! caller is looked up from ambient or global state, and a context is never
//! reused across invocations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Who is invoking the operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum CallerIdentity {
    Anonymous,
    Principal(String),
}

impl CallerIdentity {
    /// Build an identity from an optional header value; blank values are anonymous
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => CallerIdentity::Principal(v.to_string()),
            _ => CallerIdentity::Anonymous,
        }
    }

    pub fn principal(&self) -> Option<&str> {
        match self {
            CallerIdentity::Anonymous => None,
            CallerIdentity::Principal(p) => Some(p),
        }
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallerIdentity::Anonymous => f.write_str("anonymous"),
            CallerIdentity::Principal(p) => f.write_str(p),
        }
    }
}

/// Caller identity and correlation metadata for one invocation
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub request_id: String,
    pub caller: CallerIdentity,
    /// Operation being invoked; set by the dispatcher
    pub operation: Option<String>,
    pub received_at: DateTime<Utc>,
    deadline: Option<Instant>,
}

impl InvocationContext {
    pub fn new(caller: CallerIdentity) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            caller,
            operation: None,
            received_at: Utc::now(),
            deadline: None,
        }
    }

    pub fn anonymous() -> Self {
        Self::new(CallerIdentity::Anonymous)
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn for_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Set the deadline relative to now
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the gateway gives up on this invocation
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}
