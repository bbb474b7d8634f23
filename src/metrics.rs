//! Prometheus metrics for the MCP server, served at `/metrics` on the HTTP
//! transport.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::Duration;

pub static METRICS: Lazy<Arc<MetricsCollector>> = Lazy::new(|| Arc::new(MetricsCollector::new()));

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub tool: String,
    pub status: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    pub tool: String,
    pub error_type: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ToolLabels {
    pub tool: String,
}

pub struct MetricsCollector {
    registry: RwLock<Registry>,
    pub requests_total: Family<RequestLabels, Counter>,
    pub request_duration_seconds: Family<ToolLabels, Histogram>,
    pub errors_total: Family<ErrorLabels, Counter>,
    pub bridge_invocations_total: Counter,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let requests_total = Family::<RequestLabels, Counter>::default();
        registry.register(
            "mcp_requests_total",
            "Total number of MCP tool requests",
            requests_total.clone(),
        );

        let request_duration_seconds =
            Family::<ToolLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.005, 2.0, 12))
            });
        registry.register(
            "mcp_request_duration_seconds",
            "MCP tool request duration in seconds",
            request_duration_seconds.clone(),
        );

        let errors_total = Family::<ErrorLabels, Counter>::default();
        registry.register(
            "mcp_errors_total",
            "Total number of MCP tool errors by classification",
            errors_total.clone(),
        );

        let bridge_invocations_total = Counter::default();
        registry.register(
            "mcp_bridge_invocations_total",
            "Total automation bridge subprocess invocations",
            bridge_invocations_total.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            requests_total,
            request_duration_seconds,
            errors_total,
            bridge_invocations_total,
        }
    }

    pub fn record_request(&self, tool: &str, success: bool, duration: Duration) {
        self.requests_total
            .get_or_create(&RequestLabels {
                tool: tool.to_string(),
                status: if success { "success" } else { "error" }.to_string(),
            })
            .inc();
        self.request_duration_seconds
            .get_or_create(&ToolLabels {
                tool: tool.to_string(),
            })
            .observe(duration.as_secs_f64());
    }

    pub fn record_error(&self, tool: &str, error_type: &str) {
        self.errors_total
            .get_or_create(&ErrorLabels {
                tool: tool.to_string(),
                error_type: error_type.to_string(),
            })
            .inc();
    }

    pub fn record_bridge_invocation(&self) {
        self.bridge_invocations_total.inc();
    }

    /// Encode the registry in Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let registry = self.registry.read();
        let mut out = String::new();
        if encode(&mut out, &registry).is_err() {
            out.clear();
        }
        out
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
