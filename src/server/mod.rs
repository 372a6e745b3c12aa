//! The vitalog sync server.
//!
//! Stores each user's diets and food entries as JSON documents and pushes
//! full collection snapshots to WebSocket subscribers after every write.

pub mod auth;
pub mod hub;
pub mod routes;
pub mod storage;

pub use auth::{ApiKeyEntry, ApiKeyStore, AuthUser};
pub use hub::SyncHub;
pub use storage::{DocumentStorage, StorageError};

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Directory holding the SQLite database
    pub data_dir: PathBuf,
    /// Path to the API key config file
    pub config_path: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let port = std::env::var("VITALOG_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let data_dir = std::env::var("VITALOG_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("vitalog-server")
            });

        let config_path = std::env::var("VITALOG_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("vitalog-server")
                    .join("config.yaml")
            });

        Self {
            port,
            data_dir,
            config_path,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("vitalog.db")
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub api_keys: Arc<ApiKeyStore>,
    pub storage: DocumentStorage,
    pub hub: Arc<SyncHub>,
    /// Held from a write until its snapshot is published, so subscribers
    /// see snapshots in write order.
    pub writes: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(api_keys: ApiKeyStore, storage: DocumentStorage) -> Self {
        Self {
            api_keys: Arc::new(api_keys),
            storage,
            hub: Arc::new(SyncHub::new()),
            writes: Arc::new(Mutex::new(())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    // Public routes (no auth, or auth via query string)
    let public_routes = Router::new()
        .route("/health", get(routes::health))
        .route("/collections/{name}/subscribe", get(routes::subscribe));

    // Protected routes (bearer auth required)
    let protected_routes = Router::new()
        .route("/me", get(routes::me))
        .route("/collections", delete(routes::clear_collections))
        .route(
            "/collections/{name}",
            get(routes::list_collection).put(routes::put_batch),
        )
        .route("/collections/{name}/replace", post(routes::replace_collection))
        .route(
            "/collections/{name}/{id}",
            put(routes::put_document).delete(routes::delete_document),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
