//! Remote store backed by the vitalog sync server.
//!
//! Documents travel as JSON over plain HTTP; live updates arrive over one
//! WebSocket per subscribed collection, each frame carrying the full
//! collection.

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use uuid::Uuid;

use super::{RemoteError, RemoteStore, Subscription};
use crate::auth::{AuthSession, Principal};
use crate::store::{CollectionKind, Entity};

/// Response body of `GET /me`.
#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    pub user_id: String,
}

#[derive(Clone)]
pub struct HttpRemoteStore {
    server_url: String,
    auth: AuthSession,
    client: reqwest::Client,
}

impl HttpRemoteStore {
    pub fn new(server_url: impl Into<String>, auth: AuthSession) -> Self {
        Self {
            server_url: server_url.into(),
            auth,
            client: reqwest::Client::new(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Resolves an API key to its principal via `GET /me`.
    pub async fn identity(&self, api_key: &str) -> Result<Principal, RemoteError> {
        let response = self
            .client
            .get(self.build_http_url("/me"))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(network)?;
        let me: MeResponse = check(response).await?.json().await.map_err(network)?;

        Ok(Principal::new(me.user_id).with_token(api_key))
    }

    /// Returns true when `GET /health` answers with a success status.
    pub async fn check_health(&self) -> bool {
        match self.client.get(self.build_http_url("/health")).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn token(&self) -> Result<String, RemoteError> {
        self.auth.require()?.token.ok_or(RemoteError::Unauthenticated)
    }

    fn collection_url(&self, kind: CollectionKind) -> String {
        self.build_http_url(&format!("/collections/{}", kind.name()))
    }

    fn document_url(&self, kind: CollectionKind, id: Uuid) -> String {
        self.build_http_url(&format!("/collections/{}/{}", kind.name(), id))
    }

    fn build_ws_url(&self, kind: CollectionKind, token: &str) -> String {
        // Convert http(s) to ws(s) if needed
        let base_url = if self.server_url.starts_with("http://") {
            self.server_url.replacen("http://", "ws://", 1)
        } else if self.server_url.starts_with("https://") {
            self.server_url.replacen("https://", "wss://", 1)
        } else if !self.server_url.starts_with("ws://") && !self.server_url.starts_with("wss://") {
            format!("ws://{}", self.server_url)
        } else {
            self.server_url.clone()
        };

        format!(
            "{}/collections/{}/subscribe?key={}",
            base_url.trim_end_matches('/'),
            kind.name(),
            urlencoding::encode(token)
        )
    }

    fn build_http_url(&self, path: &str) -> String {
        let base_url = if self.server_url.starts_with("ws://") {
            self.server_url.replacen("ws://", "http://", 1)
        } else if self.server_url.starts_with("wss://") {
            self.server_url.replacen("wss://", "https://", 1)
        } else if !self.server_url.starts_with("http://")
            && !self.server_url.starts_with("https://")
        {
            format!("http://{}", self.server_url)
        } else {
            self.server_url.clone()
        };

        format!("{}{}", base_url.trim_end_matches('/'), path)
    }
}

fn network(e: reqwest::Error) -> RemoteError {
    RemoteError::Network(e.to_string())
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(RemoteError::Unauthenticated);
    }
    let message = response.text().await.unwrap_or_default();
    Err(RemoteError::Rejected {
        status: status.as_u16(),
        message,
    })
}

impl RemoteStore for HttpRemoteStore {
    async fn fetch_all<T: Entity>(&self) -> Result<Vec<T>, RemoteError> {
        let token = self.token()?;
        let response = self
            .client
            .get(self.collection_url(T::KIND))
            .bearer_auth(token)
            .send()
            .await
            .map_err(network)?;
        let body = check(response).await?.text().await.map_err(network)?;

        Ok(serde_json::from_str(&body)?)
    }

    async fn upsert<T: Entity>(&self, entity: &T) -> Result<(), RemoteError> {
        let token = self.token()?;
        let body = serde_json::to_vec(entity)?;
        let response = self
            .client
            .put(self.document_url(T::KIND, entity.id()))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(network)?;
        check(response).await?;
        Ok(())
    }

    async fn upsert_batch<T: Entity>(&self, entities: &[T]) -> Result<(), RemoteError> {
        let token = self.token()?;
        let body = serde_json::to_vec(entities)?;
        let response = self
            .client
            .put(self.collection_url(T::KIND))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(network)?;
        check(response).await?;
        Ok(())
    }

    async fn replace_all<T: Entity>(&self, entities: &[T]) -> Result<(), RemoteError> {
        let token = self.token()?;
        let body = serde_json::to_vec(entities)?;
        let response = self
            .client
            .post(self.build_http_url(&format!("/collections/{}/replace", T::KIND.name())))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(network)?;
        check(response).await?;
        Ok(())
    }

    async fn delete<T: Entity>(&self, id: Uuid) -> Result<(), RemoteError> {
        let token = self.token()?;
        let response = self
            .client
            .delete(self.document_url(T::KIND, id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(network)?;
        check(response).await?;
        Ok(())
    }

    fn subscribe<T: Entity>(&self) -> Result<Subscription<T>, RemoteError> {
        let token = self.token()?;
        let ws_url = self.build_ws_url(T::KIND, &token);

        Ok(Subscription::spawn(move |tx| async move {
            let ws_stream = match connect_async(ws_url.as_str()).await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    tracing::warn!("Failed to subscribe to {}: {}", T::KIND, e);
                    return;
                }
            };
            tracing::debug!("Subscribed to {}", T::KIND);

            let (mut sender, mut receiver) = ws_stream.split();
            while let Some(message) = receiver.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<Vec<T>>(&text) {
                        Ok(items) => {
                            if tx.send(items).is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::warn!("Dropping undecodable {} snapshot: {}", T::KIND, e),
                    },
                    Ok(Message::Ping(data)) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("{} subscription failed: {}", T::KIND, e);
                        break;
                    }
                }
            }
            let _ = sender.send(Message::Close(None)).await;
            tracing::debug!("Subscription to {} closed", T::KIND);
        }))
    }

    async fn clear_all(&self) -> Result<(), RemoteError> {
        let token = self.token()?;
        let response = self
            .client
            .delete(self.build_http_url("/collections"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(network)?;
        check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Diet;

    fn store(url: &str) -> HttpRemoteStore {
        HttpRemoteStore::new(url, AuthSession::new())
    }

    #[test]
    fn test_build_http_url() {
        assert_eq!(
            store("ws://localhost:8080").build_http_url("/me"),
            "http://localhost:8080/me"
        );
        assert_eq!(
            store("https://sync.example.com/").build_http_url("/collections/diets"),
            "https://sync.example.com/collections/diets"
        );
        assert_eq!(
            store("localhost:8080").build_http_url("/health"),
            "http://localhost:8080/health"
        );
    }

    #[test]
    fn test_build_ws_url_encodes_key() {
        let url = store("https://sync.example.com").build_ws_url(CollectionKind::FoodEntries, "a b&c");
        assert_eq!(
            url,
            "wss://sync.example.com/collections/foodEntries/subscribe?key=a%20b%26c"
        );
    }

    #[tokio::test]
    async fn test_requires_token_before_any_request() {
        let auth = AuthSession::new();
        let remote = HttpRemoteStore::new("http://127.0.0.1:9", auth.clone());
        assert_eq!(
            remote.fetch_all::<Diet>().await.unwrap_err(),
            RemoteError::Unauthenticated
        );

        // A principal without a bearer token cannot talk to the server either.
        auth.sign_in(Principal::new("alice"));
        assert_eq!(
            remote.delete::<Diet>(Uuid::new_v4()).await.unwrap_err(),
            RemoteError::Unauthenticated
        );
        assert!(matches!(
            remote.subscribe::<Diet>(),
            Err(RemoteError::Unauthenticated)
        ));
    }
}
