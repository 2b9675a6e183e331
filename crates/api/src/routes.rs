use axum::{
    routing::{any, delete, get, post, put},
    Router,
};

use crate::{handlers::*, AppState};

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Endpoint definition management
        .route("/create", post(create_endpoint))
        .route("/edit/:id", put(edit_endpoint))
        .route("/delete/:id", delete(delete_endpoint))
        .route("/endpoints", get(list_endpoints))
        .route("/endpoints/:id", get(get_endpoint))
        // Health and metrics
        .route("/healthz", get(health_check))
        .route("/metrics", get(metrics))
        // Mock-serving surface
        .route("/api/*path", any(mock_gateway))
}

pub fn build_router(state: AppState) -> Router {
    create_router().with_state(state)
}
