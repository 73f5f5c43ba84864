//! Meditate Service - HTTP API for profiles and credits
//!
//! This is the main entry point for the meditate service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meditate_service::{create_router, AppState, ServiceConfig, StorageBackend};
use meditate_store::{MemoryStore, PgStore, ProfileStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,meditate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Meditate Service");

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        storage = %config.storage.name(),
        admin_configured = %config.admin_api_key.is_some(),
        default_credits = %config.default_credits,
        max_write_attempts = %config.max_write_attempts,
        "Service configuration loaded"
    );

    let store = open_store(&config.storage).await?;

    let state = AppState::new(store, config.clone());
    let app = create_router(state);

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn open_store(
    backend: &StorageBackend,
) -> Result<Arc<dyn ProfileStore>, Box<dyn std::error::Error>> {
    match backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store - profiles are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres {
            database_url,
            max_connections,
        } => {
            tracing::info!(max_connections = %max_connections, "Connecting to PostgreSQL");
            let store = PgStore::connect(database_url, *max_connections).await?;
            store.migrate().await?;
            tracing::info!("PostgreSQL migrations applied");
            Ok(Arc::new(store))
        }
        #[cfg(feature = "rocksdb-backend")]
        StorageBackend::RocksDb { data_dir } => {
            tracing::info!(path = %data_dir, "Opening RocksDB store");
            Ok(Arc::new(meditate_store::RocksStore::open(data_dir)?))
        }
        #[cfg(not(feature = "rocksdb-backend"))]
        StorageBackend::RocksDb { .. } => {
            Err("STORAGE_BACKEND=rocksdb requires the rocksdb-backend feature".into())
        }
    }
}
