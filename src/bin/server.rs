//! Vitalog Sync Server
//!
//! Stores each user's diets and food entries and streams changes to every
//! signed-in device.
//!
//! # Configuration
//!
//! Environment variables:
//! - `VITALOG_PORT`: Port to listen on (default: 8080)
//! - `VITALOG_DATA_DIR`: Directory for the database (default: ~/.local/share/vitalog-server)
//! - `VITALOG_CONFIG`: Path to config file (default: ~/.config/vitalog-server/config.yaml)
//!
//! # Config File Format
//!
//! ```yaml
//! api_keys:
//!   - key: "your-secret-key-here"
//!     user_id: "user1"
//! ```
//!
//! # Endpoints
//!
//! - `GET /health`: Health check (no auth)
//! - `GET /me`: Current user
//! - `GET|PUT /collections/{name}`: Read a collection / write a batch
//! - `PUT|DELETE /collections/{name}/{id}`: Write / delete one document
//! - `DELETE /collections`: Delete everything the user owns
//! - `GET /collections/{name}/subscribe?key=...`: WebSocket snapshot stream

use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitalog::server::{router, ApiKeyStore, AppState, DocumentStorage, ServerConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitalog=info,vitalog_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Config file: {}", config.config_path.display());

    let storage = match DocumentStorage::open(&config.database_path()).await {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };
    let api_keys = ApiKeyStore::load(&config.config_path);
    let app = router(AppState::new(api_keys, storage));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
