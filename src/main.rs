//! Pickem Backend Service
//!
//! Main entry point for the Pickem draft prediction backend. Serves the JSON
//! API and change notifications over a single WebSocket port.

use pickem_backend::api::ApiHandler;
use pickem_backend::config::{AppConfig, StoreBackend};
use pickem_backend::database;
use pickem_backend::error::{AppError, AppResult};
use pickem_backend::services::{AuditTrailService, DataDragonSource};
use pickem_backend::store::{memory::MemoryDraftStore, postgres::PgDraftStore};
use pickem_backend::websocket::WebSocketServer;
use pickem_backend::{AppState, DraftStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("pickem_backend={},sqlx=warn", config.log_level).into());

    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn open_store(config: &AppConfig) -> AppResult<Arc<dyn DraftStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            warn!("Using in-memory store, data is lost on shutdown");
            Ok(Arc::new(MemoryDraftStore::new()))
        }
        StoreBackend::Postgres => {
            info!("Connecting to database...");
            let pool = database::connect(&config.database).await.map_err(|e| {
                error!("Database setup failed: {}", e);
                AppError::Database(e)
            })?;
            info!("Database ready");

            Ok(Arc::new(PgDraftStore::new(pool)))
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    dotenv::dotenv().ok();

    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    init_tracing(&config);

    info!("Pickem backend starting");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("Store backend: {:?}", config.store_backend);

    let store = open_store(&config).await?;

    let audit = match AuditTrailService::new(&config.audit_log_dir) {
        Ok(audit) => {
            info!("✓ Audit trail writing to {}", config.audit_log_dir);
            Some(Arc::new(audit))
        }
        Err(e) if config.is_production() => {
            error!("Failed to initialize audit trail: {}", e);
            return Err(e);
        }
        Err(e) => {
            warn!("Audit trail disabled: {}", e);
            None
        }
    };

    let champion_source = Arc::new(DataDragonSource::new(config.champions.data_url.clone()));
    let ws_port = config.ws_port;
    let state = Arc::new(AppState::new(config, store, champion_source, audit));
    info!("✓ Services initialized");

    let ws_server = WebSocketServer::new();
    let handler = Arc::new(ApiHandler::new(state.clone(), ws_server.clone()));

    let ws_addr: SocketAddr = format!("0.0.0.0:{}", ws_port)
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid WebSocket address: {}", e)))?;

    let listener = TcpListener::bind(ws_addr)
        .await
        .map_err(|e| AppError::Message(format!("Failed to bind WebSocket server: {}", e)))?;

    let ws_handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New WebSocket connection from {}", addr);
                    let ws = ws_server.clone();
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = ws.handle_connection(stream, handler).await {
                            error!("WebSocket connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("WebSocket accept error: {}", e);
                }
            }
        }
    });

    info!("✓ WebSocket API listening on {}", ws_addr);
    info!("Press Ctrl+C to shutdown gracefully");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down gracefully...");
        }
        _ = ws_handle => {
            error!("WebSocket server exited unexpectedly");
        }
    }

    info!("Pickem backend shutdown complete");
    Ok(())
}
