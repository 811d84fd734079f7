//! Prometheus metrics for the gateway front
//!
//! - `gateway_invocations_total` (counter) by operation and outcome
//! - `gateway_invocation_duration_seconds` (histogram) by operation
//! - `gateway_active_invocations` (gauge)

use prometheus::{CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Instant;

use crate::error::GatewayError;

pub struct GatewayMetrics {
    registry: Arc<Registry>,
    invocations_total: CounterVec,
    duration_seconds: HistogramVec,
    active_invocations: Gauge,
}

impl GatewayMetrics {
    /// Create metrics registered in a fresh registry
    pub fn new() -> Result<Self, GatewayError> {
        Self::with_registry(Arc::new(Registry::new()))
    }

    pub fn with_registry(registry: Arc<Registry>) -> Result<Self, GatewayError> {
        let invocations_total = CounterVec::new(
            Opts::new(
                "gateway_invocations_total",
                "Total number of operation invocations by outcome",
            ),
            &["operation", "outcome"],
        )?;

        let duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "gateway_invocation_duration_seconds",
                "Operation invocation duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["operation"],
        )?;

        let active_invocations = Gauge::new(
            "gateway_active_invocations",
            "Number of invocations currently in progress",
        )?;

        registry.register(Box::new(invocations_total.clone()))?;
        registry.register(Box::new(duration_seconds.clone()))?;
        registry.register(Box::new(active_invocations.clone()))?;

        Ok(Self {
            registry,
            invocations_total,
            duration_seconds,
            active_invocations,
        })
    }

    pub fn record_outcome(&self, operation: &str, outcome: &str) {
        self.invocations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Start timing an invocation; the guard records duration on drop
    pub fn start_invocation(&self, operation: &str) -> InvocationTimer<'_> {
        self.active_invocations.inc();
        InvocationTimer {
            start: Instant::now(),
            operation: operation.to_string(),
            metrics: self,
        }
    }

    pub fn invocations(&self, operation: &str, outcome: &str) -> f64 {
        self.invocations_total
            .with_label_values(&[operation, outcome])
            .get()
    }

    pub fn active(&self) -> f64 {
        self.active_invocations.get()
    }

    /// Prometheus text exposition of every registered metric
    pub fn render(&self) -> Result<String, GatewayError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| GatewayError::Config(format!("metrics output is not UTF-8: {}", e)))
    }
}

/// RAII guard for timing invocations
pub struct InvocationTimer<'a> {
    start: Instant,
    operation: String,
    metrics: &'a GatewayMetrics,
}

impl<'a> Drop for InvocationTimer<'a> {
    fn drop(&mut self) {
        self.metrics
            .duration_seconds
            .with_label_values(&[self.operation.as_str()])
            .observe(self.start.elapsed().as_secs_f64());
        self.metrics.active_invocations.dec();
    }
}
