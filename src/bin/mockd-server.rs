use anyhow::Result;
use mockd_engine::MockEngine;
use mockd_metrics::MetricsService;
use mockd_models::Config;
use mockd_store::EndpointStore;
use sqlx::SqlitePool;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    // Try to load from various config locations
    let config_paths = ["configs/default.toml", "config/config.toml"];

    for path in &config_paths {
        if Path::new(path).exists() {
            let contents = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)?;
            return Ok(config);
        }
    }

    Err("No config file found".into())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().init();

    info!("Starting Mockd server");

    // Load configuration from file or use defaults
    let config = load_config().unwrap_or_else(|e| {
        warn!("Failed to load config file: {}, using defaults", e);
        Config::default()
    });

    info!("Configuration loaded: {:?}", config);

    // Ensure the data directory and database file exist for SQLite
    if !config.data.dir.is_empty() {
        let _ = fs::create_dir_all(&config.data.dir);
    }

    let db_path = config
        .data
        .db_url
        .strip_prefix("sqlite://")
        .or_else(|| config.data.db_url.strip_prefix("sqlite:"));

    if let Some(db_path) = db_path {
        if let Some(parent) = Path::new(db_path).parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create DB parent directory {:?}: {}", parent, e);
            }
        }
        if !Path::new(db_path).exists() {
            if let Err(e) = fs::File::create(db_path) {
                warn!("Failed to create database file {:?}: {}", db_path, e);
            } else {
                info!("Created database file: {}", db_path);
            }
        }
    }

    // Initialize database pool and run migrations
    let pool = SqlitePool::connect(&config.data.db_url).await?;
    info!("Database connected");

    let store = EndpointStore::new(pool).await?;

    // Initialize metrics service
    let metrics = Arc::new(MetricsService::new()?);

    // Initialize the request engine
    let engine = Arc::new(MockEngine::new(store.clone(), &config)?);

    let bind_addr = config.server.bind.clone();
    let port = config.server.port;

    // Start the HTTP server
    let server_handle = {
        let config = config.clone();
        let store = store.clone();
        let engine = engine.clone();
        let metrics = metrics.clone();
        let bind = bind_addr.clone();
        tokio::spawn(async move {
            if let Err(e) =
                mockd_api::start_server(bind, port, config, store, engine, metrics).await
            {
                warn!("Server error: {}", e);
            }
        })
    };

    info!("Mockd server started successfully on {}:{}", bind_addr, port);

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal");
        }
        Err(err) => {
            warn!("Unable to listen for shutdown signal: {}", err);
        }
    }

    info!("Shutting down Mockd server...");
    server_handle.abort();

    info!("Mockd server shutdown complete");
    Ok(())
}
