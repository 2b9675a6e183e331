use axum::body::Body;
use axum::http::{Request, StatusCode};
use mockd_api::{build_router, AppState};
use mockd_engine::MockEngine;
use mockd_metrics::MetricsService;
use mockd_models::Config;
use mockd_store::EndpointStore;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower::util::ServiceExt;

// Spin up the router in-memory
async fn test_app() -> axum::Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = EndpointStore::new(pool).await.unwrap();
    let config = Config::default();
    let engine = Arc::new(MockEngine::new(store.clone(), &config).unwrap());
    let metrics = Arc::new(MetricsService::new().unwrap());
    build_router(AppState::new(config, store, engine, metrics))
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn create_returns_created_with_message() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/create",
        Some(json!({
            "path": "/users",
            "method": "GET",
            "response": {"users": []},
            "status": 200
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Endpoint created/updated successfully.");
}

#[tokio::test]
async fn create_without_path_is_malformed() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/create",
        Some(json!({"method": "GET", "response": {}})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "MalformedDefinition");
}

#[tokio::test]
async fn create_with_unknown_method_is_malformed() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/create",
        Some(json!({"path": "/x", "method": "TRACE"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "MalformedDefinition");
}

#[tokio::test]
async fn create_with_non_json_body_is_malformed() {
    let app = test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/create")
        .header("content-type", "application/json")
        .body(Body::from("definitely not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_and_get_round_trip() {
    let app = test_app().await;

    send(
        &app,
        "POST",
        "/create",
        Some(json!({"path": "/a", "method": "GET", "response": {"a": 1}})),
    )
    .await;
    send(
        &app,
        "POST",
        "/create",
        Some(json!({"path": "/b", "method": "POST", "response": {"b": 2}})),
    )
    .await;

    let (status, body) = send(&app, "GET", "/endpoints", None).await;
    assert_eq!(status, StatusCode::OK);
    let endpoints = body["endpoints"].as_array().unwrap();
    assert_eq!(endpoints.len(), 2);

    let id = endpoints[0]["id"].as_i64().unwrap();
    let (status, body) = send(&app, "GET", &format!("/endpoints/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["path"], "/a");
    assert_eq!(body["response"], json!({"a": 1}));
}

#[tokio::test]
async fn get_unknown_endpoint_is_404() {
    let app = test_app().await;

    let (status, body) = send(&app, "GET", "/endpoints/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "EndpointNotFound");
}

#[tokio::test]
async fn edit_applies_partial_update() {
    let app = test_app().await;

    send(
        &app,
        "POST",
        "/create",
        Some(json!({"path": "/thing", "method": "GET", "response": {"v": 1}})),
    )
    .await;
    let (_, body) = send(&app, "GET", "/endpoints", None).await;
    let id = body["endpoints"][0]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/edit/{id}"),
        Some(json!({"status": 203})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Endpoint updated successfully.");

    let (_, body) = send(&app, "GET", &format!("/endpoints/{id}"), None).await;
    assert_eq!(body["status"], 203);
    assert_eq!(body["response"], json!({"v": 1}));
}

#[tokio::test]
async fn edit_unknown_endpoint_is_404() {
    let app = test_app().await;

    let (status, _) = send(&app, "PUT", "/edit/41", Some(json!({"status": 200}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_then_delete_again_is_404() {
    let app = test_app().await;

    send(
        &app,
        "POST",
        "/create",
        Some(json!({"path": "/gone", "method": "DELETE"})),
    )
    .await;
    let (_, body) = send(&app, "GET", "/endpoints", None).await;
    let id = body["endpoints"][0]["id"].as_i64().unwrap();

    let (status, body) = send(&app, "DELETE", &format!("/delete/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Endpoint deleted.");

    let (status, _) = send(&app, "DELETE", &format!("/delete/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_check_is_ok() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"OK");
}
