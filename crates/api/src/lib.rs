pub mod handlers;
pub mod routes;
pub mod state;

pub use handlers::*;
pub use routes::*;
pub use state::*;

use axum::Router;
use mockd_engine::MockEngine;
use mockd_metrics::MetricsService;
use mockd_models::Config;
use mockd_store::EndpointStore;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub async fn start_server(
    bind: String,
    port: u16,
    config: Config,
    store: EndpointStore,
    engine: Arc<MockEngine>,
    metrics: Arc<MetricsService>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app_state = AppState {
        config,
        store,
        engine,
        metrics,
    };

    let app = Router::new().merge(build_router(app_state)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind, port)).await?;
    info!("Mockd server listening on {}:{}", bind, port);

    axum::serve(listener, app).await?;
    Ok(())
}
