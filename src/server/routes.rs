//! HTTP and WebSocket handlers.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use vitalog_core::CollectionKind;

use super::auth::{unauthorized, AuthUser};
use super::hub::Snapshot;
use super::storage::{parse_collection, StorageError};
use super::AppState;

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

pub struct ApiError(StorageError);

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self.0 {
            StorageError::InvalidCollection(_) => (StatusCode::NOT_FOUND, "unknown_collection"),
            StorageError::InvalidDocument(_) => (StatusCode::BAD_REQUEST, "invalid_document"),
            _ => {
                tracing::error!("Storage failure: {}", self.0);
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
        };
        (
            status,
            Json(ErrorBody {
                error,
                message: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct MeResponse {
    user_id: String,
}

pub async fn me(Extension(user): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.user_id,
    })
}

/// Reads the collection and sends it to every subscriber.
async fn publish(state: &AppState, user_id: &str, kind: CollectionKind) -> Result<(), ApiError> {
    let snapshot = read_snapshot(state, user_id, kind).await?;
    state.hub.publish(user_id, kind, snapshot).await;
    Ok(())
}

async fn read_snapshot(state: &AppState, user_id: &str, kind: CollectionKind) -> Result<Snapshot, ApiError> {
    let documents = state.storage.list(user_id, kind).await?;
    let json = serde_json::to_string(&documents)
        .map_err(|e| StorageError::InvalidDocument(e.to_string()))?;
    Ok(Arc::from(json))
}

pub async fn list_collection(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let kind = parse_collection(&name)?;
    Ok(Json(state.storage.list(&user.user_id, kind).await?))
}

pub async fn put_batch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
    Json(documents): Json<Vec<Value>>,
) -> Result<StatusCode, ApiError> {
    let kind = parse_collection(&name)?;
    let _writes = state.writes.lock().await;
    tracing::debug!("{} writes {} {} document(s)", user.user_id, documents.len(), kind);
    state.storage.upsert_batch(&user.user_id, kind, documents).await?;
    publish(&state, &user.user_id, kind).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn replace_collection(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
    Json(documents): Json<Vec<Value>>,
) -> Result<StatusCode, ApiError> {
    let kind = parse_collection(&name)?;
    let _writes = state.writes.lock().await;
    tracing::debug!("{} replaces {} with {} document(s)", user.user_id, kind, documents.len());
    state.storage.replace(&user.user_id, kind, documents).await?;
    publish(&state, &user.user_id, kind).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn put_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((name, id)): Path<(String, String)>,
    Json(document): Json<Value>,
) -> Result<StatusCode, ApiError> {
    let kind = parse_collection(&name)?;
    let _writes = state.writes.lock().await;
    state.storage.upsert(&user.user_id, kind, &id, document).await?;
    publish(&state, &user.user_id, kind).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((name, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let kind = parse_collection(&name)?;
    let _writes = state.writes.lock().await;
    if state.storage.delete(&user.user_id, kind, &id).await? {
        publish(&state, &user.user_id, kind).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Clears every collection of the user, one collection at a time. Each
/// collection publishes its (empty) snapshot, even if it was empty already.
pub async fn clear_collections(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    let _writes = state.writes.lock().await;
    for kind in CollectionKind::ALL {
        let removed = state.storage.clear(&user.user_id, kind).await?;
        tracing::info!("Cleared {} {} document(s) of {}", removed, kind, user.user_id);
        publish(&state, &user.user_id, kind).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct SubscribeQuery {
    key: Option<String>,
}

/// WebSocket subscription. The API key travels in the query string because
/// WebSocket clients cannot always set headers.
pub async fn subscribe(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<SubscribeQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(user) = query.key.as_deref().and_then(|key| state.api_keys.validate(key)) else {
        return unauthorized("invalid_key", "Invalid API key");
    };
    let kind = match parse_collection(&name) {
        Ok(kind) => kind,
        Err(e) => return ApiError(e).into_response(),
    };

    ws.on_upgrade(move |socket| stream_snapshots(socket, state, user, kind))
}

async fn stream_snapshots(mut socket: WebSocket, state: AppState, user: AuthUser, kind: CollectionKind) {
    tracing::info!("{} subscribed to {}", user.user_id, kind);

    // No write may land between subscribing and reading, or the first
    // broadcast could carry older content than the initial snapshot.
    let (mut updates, mut next) = {
        let _writes = state.writes.lock().await;
        let updates = state.hub.subscribe(&user.user_id, kind).await;
        (updates, read_snapshot(&state, &user.user_id, kind).await.ok())
    };
    loop {
        if let Some(snapshot) = next.take() {
            if socket.send(Message::Text(snapshot.to_string().into())).await.is_err() {
                break;
            }
        }

        tokio::select! {
            update = updates.recv() => match update {
                Ok(snapshot) => next = Some(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // The snapshots still buffered are newer, keep going in order.
                    tracing::warn!("{} subscriber to {} skipped {} snapshot(s)", user.user_id, kind, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!("{} unsubscribed from {}", user.user_id, kind);
}
