mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

pub use server::{start_metrics_server, PoolProbe};

// ============================================================================
// Metrics - Prometheus metrics for the order service
// ============================================================================
//
// - gRPC requests by method and response code, and their latency
// - Orders created
// - order.created publication outcomes
//
// Scraped via GET /metrics on the metrics port.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub grpc_requests_total: IntCounterVec,
    pub grpc_request_duration: HistogramVec,
    pub orders_created_total: IntCounter,
    pub events_published_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let grpc_requests_total = IntCounterVec::new(
            Opts::new("grpc_requests_total", "gRPC requests by method and response code"),
            &["method", "code"],
        )?;
        registry.register(Box::new(grpc_requests_total.clone()))?;

        let grpc_request_duration = HistogramVec::new(
            HistogramOpts::new("grpc_request_duration_seconds", "gRPC request duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0]),
            &["method"],
        )?;
        registry.register(Box::new(grpc_request_duration.clone()))?;

        let orders_created_total =
            IntCounter::new("orders_created_total", "Orders committed to the store")?;
        registry.register(Box::new(orders_created_total.clone()))?;

        let events_published_total = IntCounterVec::new(
            Opts::new(
                "order_events_published_total",
                "order.created publications by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(events_published_total.clone()))?;

        Ok(Self {
            registry,
            grpc_requests_total,
            grpc_request_duration,
            orders_created_total,
            events_published_total,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_request(&self, method: &str, code: &str, duration_secs: f64) {
        self.grpc_requests_total.with_label_values(&[method, code]).inc();
        self.grpc_request_duration
            .with_label_values(&[method])
            .observe(duration_secs);
    }

    pub fn record_publish(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.events_published_total.with_label_values(&[outcome]).inc();
    }
}
