use anyhow::Result;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Json},
    routing::any,
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A real upstream service for proxy tests, counting every request it
/// receives so tests can assert that a call did (or did not) happen.
#[derive(Debug)]
pub struct TestUpstream {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl TestUpstream {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for TestUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Clone)]
struct UpstreamState {
    hits: Arc<AtomicUsize>,
}

pub async fn spawn_upstream() -> Result<TestUpstream> {
    let hits = Arc::new(AtomicUsize::new(0));
    let state = UpstreamState { hits: hits.clone() };

    let app = Router::new()
        .route("/echo", any(echo))
        .route("/reflect", any(reflect))
        .route("/slow", any(slow))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestUpstream {
        base_url: format!("http://{addr}"),
        hits,
        handle,
    })
}

/// Fixed 201 + `{"ok": true}` with a marker header, for relay assertions.
async fn echo(State(state): State<UpstreamState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::CREATED,
        [("x-upstream", "echo")],
        Json(json!({"ok": true})),
    )
}

/// Returns what it received: method, headers, parsed body.
async fn reflect(
    State(state): State<UpstreamState>,
    req: Request<Body>,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let method = req.method().to_string();
    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.as_str().to_string(), s.to_string())))
        .collect();
    let body = axum::body::to_bytes(req.into_body(), 1024 * 1024)
        .await
        .unwrap_or_default();
    let body_json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    Json(json!({
        "method": method,
        "headers": headers,
        "body": body_json,
    }))
}

/// Slower than any sane proxy timeout.
async fn slow(State(state): State<UpstreamState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"late": true}))
}
