use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatflow_server::api::{self, AppState};
use chatflow_server::config::ServerConfig;
use chatflow_server::registry::ConnectionRegistry;
use chatflow_server::store::SqliteMessageStore;
use chatflow_shared::constants::EVENT_BUFFER;
use chatflow_store::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,chatflow_server=debug")),
        )
        .init();

    info!("Starting ChatFlow relay v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    if config.uses_default_secret() {
        tracing::warn!("JWT_SECRET is not set; using the insecure development default");
    }
    info!(
        addr = %config.http_addr,
        origin = %config.allowed_origin,
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    let db = Arc::new(Mutex::new(db));

    let store = Arc::new(SqliteMessageStore::new(Arc::clone(&db)));
    let registry = Arc::new(ConnectionRegistry::new());
    let (delivered_tx, _) = broadcast::channel(EVENT_BUFFER);

    let http_addr = config.http_addr;
    let state = AppState {
        db,
        store,
        registry,
        delivered_tx,
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Relay server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
