use mockd_engine::MockEngine;
use mockd_metrics::MetricsService;
use mockd_models::Config;
use mockd_store::EndpointStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: EndpointStore,
    pub engine: Arc<MockEngine>,
    pub metrics: Arc<MetricsService>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: EndpointStore,
        engine: Arc<MockEngine>,
        metrics: Arc<MetricsService>,
    ) -> Self {
        Self {
            config,
            store,
            engine,
            metrics,
        }
    }
}
