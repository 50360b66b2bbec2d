//! Example server: loads settings and the schema registry, picks a backend, mounts the routes.
//!
//! With `DATABASE_URL` set, reads and writes go to PostgreSQL; otherwise an
//! in-memory document store is used.

use datagate_sdk::{app, load_from_path, AppState, MemoryStore, PgStore, Settings, StoreClient};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("datagate_sdk=info".parse()?))
        .init();

    let settings = Settings::from_env()?;
    let registry = load_from_path(&settings.schema_path).await?;
    tracing::info!(tables = registry.table_names().count(), path = %settings.schema_path, "schema loaded");

    let store: Arc<dyn StoreClient> = match &settings.database_url {
        Some(url) => Arc::new(PgStore::connect(url, settings.db_max_connections).await?),
        None => Arc::new(MemoryStore::new()),
    };
    tracing::info!(backend = store.backend(), "store ready");

    let bind_addr = settings.bind_addr.clone();
    let router = app(AppState::new(store, registry, settings));

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
