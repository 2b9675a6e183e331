use anyhow::Result;
use mockd_api::{build_router, AppState};
use mockd_engine::MockEngine;
use mockd_metrics::MetricsService;
use mockd_models::Config;
use mockd_store::EndpointStore;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// A full Mockd server running in-process on an ephemeral port, backed
/// by a scratch SQLite database that dies with the test.
#[derive(Debug)]
pub struct TestServer {
    pub base_url: String,
    _data_dir: TempDir,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Debug, Default)]
pub struct ConfigOverride {
    pub upstream_timeout_ms: Option<u64>,
}

pub async fn spawn_server(config_override: Option<ConfigOverride>) -> Result<TestServer> {
    let data_dir = tempfile::tempdir()?;
    let db_path = data_dir.path().join("mockd.db");
    std::fs::File::create(&db_path)?;

    let mut config = Config::default();
    config.data.dir = data_dir.path().to_string_lossy().to_string();
    config.data.db_url = format!("sqlite://{}", db_path.display());
    if let Some(override_config) = config_override {
        if let Some(timeout_ms) = override_config.upstream_timeout_ms {
            config.upstream.timeout_ms = timeout_ms;
        }
    }

    let pool = SqlitePool::connect(&config.data.db_url).await?;
    let store = EndpointStore::new(pool).await?;
    let engine = Arc::new(MockEngine::new(store.clone(), &config)?);
    let metrics = Arc::new(MetricsService::new()?);
    let state = AppState::new(config, store, engine, metrics);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = build_router(state);
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestServer {
        base_url: format!("http://{addr}"),
        _data_dir: data_dir,
        handle,
    })
}
