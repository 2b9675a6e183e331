use mockd_models::MockError;
use prometheus::{Counter, Encoder, Registry, TextEncoder};
use tracing::{debug, instrument};

/// Request counters for the mock-serving surface, exposed in prometheus
/// text format on `GET /metrics`.
pub struct MetricsService {
    registry: Registry,
    requests_total: Counter,
    unmatched_total: Counter,
    unauthorized_total: Counter,
    validation_failures_total: Counter,
    served_total: Counter,
    proxied_total: Counter,
    upstream_errors_total: Counter,
}

impl MetricsService {
    pub fn new() -> Result<Self, MockError> {
        let registry = Registry::new();

        let requests_total = Counter::new(
            "mockd_requests_total",
            "Total number of mock-serving requests received",
        )
        .map_err(internal)?;

        let unmatched_total = Counter::new(
            "mockd_unmatched_total",
            "Requests with no matching endpoint definition",
        )
        .map_err(internal)?;

        let unauthorized_total = Counter::new(
            "mockd_unauthorized_total",
            "Requests rejected by the authorizer",
        )
        .map_err(internal)?;

        let validation_failures_total = Counter::new(
            "mockd_validation_failures_total",
            "Requests rejected by schema validation",
        )
        .map_err(internal)?;

        let served_total = Counter::new(
            "mockd_served_total",
            "Requests answered with a stored canned response",
        )
        .map_err(internal)?;

        let proxied_total = Counter::new(
            "mockd_proxied_total",
            "Requests relayed to an upstream service",
        )
        .map_err(internal)?;

        let upstream_errors_total = Counter::new(
            "mockd_upstream_errors_total",
            "Proxied requests that failed at the transport level",
        )
        .map_err(internal)?;

        // Register metrics
        registry
            .register(Box::new(requests_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(unmatched_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(unauthorized_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(validation_failures_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(served_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(proxied_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(upstream_errors_total.clone()))
            .map_err(internal)?;

        Ok(Self {
            registry,
            requests_total,
            unmatched_total,
            unauthorized_total,
            validation_failures_total,
            served_total,
            proxied_total,
            upstream_errors_total,
        })
    }

    #[instrument(skip(self))]
    pub async fn record_request(&self, method: &str, path: &str) {
        self.requests_total.inc();
        debug!("Recorded request: {} {}", method, path);
    }

    #[instrument(skip(self))]
    pub async fn record_unmatched(&self) {
        self.unmatched_total.inc();
    }

    #[instrument(skip(self))]
    pub async fn record_unauthorized(&self) {
        self.unauthorized_total.inc();
    }

    #[instrument(skip(self))]
    pub async fn record_validation_failure(&self) {
        self.validation_failures_total.inc();
    }

    #[instrument(skip(self))]
    pub async fn record_served(&self) {
        self.served_total.inc();
    }

    #[instrument(skip(self))]
    pub async fn record_proxied(&self) {
        self.proxied_total.inc();
    }

    #[instrument(skip(self))]
    pub async fn record_upstream_error(&self) {
        self.upstream_errors_total.inc();
    }

    #[instrument(skip(self))]
    pub async fn get_prometheus_metrics(&self) -> Result<String, MockError> {
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();

        encoder.encode(&metric_families, &mut buffer).map_err(|e| {
            MockError::InternalError {
                reason: e.to_string(),
            }
        })?;

        String::from_utf8(buffer).map_err(|e| MockError::InternalError {
            reason: e.to_string(),
        })
    }
}

fn internal<E: std::fmt::Display>(e: E) -> MockError {
    MockError::InternalError {
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counters_show_up_in_exposition() {
        let metrics = MetricsService::new().unwrap();
        metrics.record_request("GET", "/ping").await;
        metrics.record_served().await;

        let text = metrics.get_prometheus_metrics().await.unwrap();
        assert!(text.contains("mockd_requests_total 1"));
        assert!(text.contains("mockd_served_total 1"));
        assert!(text.contains("mockd_unmatched_total 0"));
    }
}
