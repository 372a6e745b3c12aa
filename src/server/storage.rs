//! Server-side document storage.
//!
//! Every synchronized entity is one row in a SQLite `documents` table keyed
//! by (owner, collection, id). Bodies are stored as the canonical JSON of
//! the typed entity, so anything that does not decode as a diet or food
//! entry is rejected before it reaches the database.

use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use vitalog_core::{CollectionKind, Diet, Entity, FoodEntry};

/// Errors that can occur during server storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error preparing the database location.
    IoError(PathBuf, std::io::Error),
    /// Database error.
    Database(sqlx::Error),
    /// Schema migration failed.
    Migration(sqlx::migrate::MigrateError),
    /// Unknown collection name.
    InvalidCollection(String),
    /// Document does not decode as an entity of its collection.
    InvalidDocument(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(path, e) => write!(f, "I/O error for {}: {}", path.display(), e),
            StorageError::Database(e) => write!(f, "Database error: {}", e),
            StorageError::Migration(e) => write!(f, "Migration failed: {}", e),
            StorageError::InvalidCollection(name) => write!(f, "Invalid collection: {}", name),
            StorageError::InvalidDocument(e) => write!(f, "Invalid document: {}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(_, e) => Some(e),
            StorageError::Database(e) => Some(e),
            StorageError::Migration(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::Database(e)
    }
}

/// Parses a collection name from a request path.
pub fn parse_collection(name: &str) -> Result<CollectionKind, StorageError> {
    CollectionKind::parse(name).ok_or_else(|| StorageError::InvalidCollection(name.to_string()))
}

/// Decodes a document as the entity type of `kind` and returns its id and
/// canonical JSON.
fn canonicalize(kind: CollectionKind, document: Value) -> Result<(String, String), StorageError> {
    fn typed<T: Entity>(document: Value) -> Result<(String, String), StorageError> {
        let entity: T = serde_json::from_value(document)
            .map_err(|e| StorageError::InvalidDocument(e.to_string()))?;
        let body = serde_json::to_string(&entity)
            .map_err(|e| StorageError::InvalidDocument(e.to_string()))?;
        Ok((entity.id().to_string(), body))
    }

    match kind {
        CollectionKind::Diets => typed::<Diet>(document),
        CollectionKind::FoodEntries => typed::<FoodEntry>(document),
    }
}

#[derive(Debug, Clone)]
pub struct DocumentStorage {
    pool: SqlitePool,
}

impl DocumentStorage {
    /// Opens (creating if needed) the database at `path` and runs migrations.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::IoError(parent.to_path_buf(), e))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::migrate(pool).await
    }

    /// A private in-memory database.
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        // Every in-memory connection is its own database, so keep exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self, StorageError> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(Self { pool })
    }

    /// All documents of one collection, ordered by id.
    pub async fn list(&self, user_id: &str, kind: CollectionKind) -> Result<Vec<Value>, StorageError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT body FROM documents WHERE user_id = ? AND collection = ? ORDER BY id",
        )
        .bind(user_id)
        .bind(kind.name())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(body,)| {
                serde_json::from_str(&body).map_err(|e| StorageError::InvalidDocument(e.to_string()))
            })
            .collect()
    }

    /// Writes one document. `id` must match the document's own id.
    pub async fn upsert(
        &self,
        user_id: &str,
        kind: CollectionKind,
        id: &str,
        document: Value,
    ) -> Result<(), StorageError> {
        let (doc_id, body) = canonicalize(kind, document)?;
        if doc_id != id {
            return Err(StorageError::InvalidDocument(format!(
                "document id {} does not match path id {}",
                doc_id, id
            )));
        }
        self.write_all(user_id, kind, vec![(doc_id, body)], false).await
    }

    /// Writes many documents in one transaction. Nothing is written if any
    /// document is invalid.
    pub async fn upsert_batch(
        &self,
        user_id: &str,
        kind: CollectionKind,
        documents: Vec<Value>,
    ) -> Result<(), StorageError> {
        let rows = documents
            .into_iter()
            .map(|document| canonicalize(kind, document))
            .collect::<Result<Vec<_>, _>>()?;
        self.write_all(user_id, kind, rows, false).await
    }

    /// Makes `documents` the whole collection in one transaction. Nothing
    /// changes if any document is invalid.
    pub async fn replace(
        &self,
        user_id: &str,
        kind: CollectionKind,
        documents: Vec<Value>,
    ) -> Result<(), StorageError> {
        let rows = documents
            .into_iter()
            .map(|document| canonicalize(kind, document))
            .collect::<Result<Vec<_>, _>>()?;
        self.write_all(user_id, kind, rows, true).await
    }

    async fn write_all(
        &self,
        user_id: &str,
        kind: CollectionKind,
        rows: Vec<(String, String)>,
        replace: bool,
    ) -> Result<(), StorageError> {
        let updated_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        if replace {
            sqlx::query("DELETE FROM documents WHERE user_id = ? AND collection = ?")
                .bind(user_id)
                .bind(kind.name())
                .execute(&mut *tx)
                .await?;
        }

        for (id, body) in &rows {
            sqlx::query(
                r#"
                INSERT INTO documents (user_id, collection, id, body, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT (user_id, collection, id)
                DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
                "#,
            )
            .bind(user_id)
            .bind(kind.name())
            .bind(id)
            .bind(body)
            .bind(&updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Deletes one document. Returns whether it existed.
    pub async fn delete(&self, user_id: &str, kind: CollectionKind, id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM documents WHERE user_id = ? AND collection = ? AND id = ?")
            .bind(user_id)
            .bind(kind.name())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every document of one collection. Returns how many were removed.
    pub async fn clear(&self, user_id: &str, kind: CollectionKind) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM documents WHERE user_id = ? AND collection = ?")
            .bind(user_id)
            .bind(kind.name())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    use vitalog_core::{EntryType, MealType, NewDiet, NewFoodEntry};

    fn diet_json(name: &str) -> (String, Value) {
        let diet = Diet::create(NewDiet::new(name)).unwrap();
        (diet.id.to_string(), serde_json::to_value(&diet).unwrap())
    }

    #[tokio::test]
    async fn test_open_creates_database_file() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("vitalog.db");

        let storage = DocumentStorage::open(&db_path).await.unwrap();

        assert!(db_path.exists());
        assert!(storage.list("alice", CollectionKind::Diets).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_list_delete() {
        let storage = DocumentStorage::open_in_memory().await.unwrap();
        let (id, doc) = diet_json("Keto");

        storage
            .upsert("alice", CollectionKind::Diets, &id, doc.clone())
            .await
            .unwrap();
        storage
            .upsert("alice", CollectionKind::Diets, &id, doc.clone())
            .await
            .unwrap();

        let docs = storage.list("alice", CollectionKind::Diets).await.unwrap();
        assert_eq!(docs, vec![doc]);

        assert!(storage.delete("alice", CollectionKind::Diets, &id).await.unwrap());
        assert!(!storage.delete("alice", CollectionKind::Diets, &id).await.unwrap());
        assert!(storage.list("alice", CollectionKind::Diets).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_documents_are_scoped_by_owner_and_collection() {
        let storage = DocumentStorage::open_in_memory().await.unwrap();
        let (id, doc) = diet_json("Keto");
        storage.upsert("alice", CollectionKind::Diets, &id, doc).await.unwrap();

        assert!(storage.list("bob", CollectionKind::Diets).await.unwrap().is_empty());
        assert!(storage.list("alice", CollectionKind::FoodEntries).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_with_invalid_document_writes_nothing() {
        let storage = DocumentStorage::open_in_memory().await.unwrap();
        let (_, good) = diet_json("Keto");

        let result = storage
            .upsert_batch("alice", CollectionKind::Diets, vec![good, json!({"name": "no id"})])
            .await;

        assert!(matches!(result, Err(StorageError::InvalidDocument(_))));
        assert!(storage.list("alice", CollectionKind::Diets).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_swaps_one_collection_of_one_owner() {
        let storage = DocumentStorage::open_in_memory().await.unwrap();
        let (keto_id, keto) = diet_json("Keto");
        let (_, paleo) = diet_json("Paleo");
        let (_, vegan) = diet_json("Vegan");
        storage
            .upsert_batch("alice", CollectionKind::Diets, vec![keto.clone(), paleo])
            .await
            .unwrap();
        storage.upsert("bob", CollectionKind::Diets, &keto_id, keto).await.unwrap();

        storage
            .replace("alice", CollectionKind::Diets, vec![vegan.clone()])
            .await
            .unwrap();
        assert_eq!(storage.list("alice", CollectionKind::Diets).await.unwrap(), vec![vegan.clone()]);
        assert_eq!(storage.list("bob", CollectionKind::Diets).await.unwrap().len(), 1);

        let result = storage
            .replace("alice", CollectionKind::Diets, vec![json!({"name": "no id"})])
            .await;
        assert!(matches!(result, Err(StorageError::InvalidDocument(_))));
        assert_eq!(storage.list("alice", CollectionKind::Diets).await.unwrap(), vec![vegan]);
    }

    #[tokio::test]
    async fn test_upsert_rejects_mismatched_id() {
        let storage = DocumentStorage::open_in_memory().await.unwrap();
        let (_, doc) = diet_json("Keto");

        let result = storage
            .upsert("alice", CollectionKind::Diets, "not-the-id", doc)
            .await;
        assert!(matches!(result, Err(StorageError::InvalidDocument(_))));
    }

    #[tokio::test]
    async fn test_food_entry_collection_rejects_diets() {
        let storage = DocumentStorage::open_in_memory().await.unwrap();
        let (_, diet) = diet_json("Keto");
        let entry = FoodEntry::create(
            NewFoodEntry::new(MealType::Snack, EntryType::Text).with_text("Nuts"),
        )
        .unwrap();

        let result = storage
            .upsert_batch("alice", CollectionKind::FoodEntries, vec![diet])
            .await;
        assert!(result.is_err());

        storage
            .upsert_batch(
                "alice",
                CollectionKind::FoodEntries,
                vec![serde_json::to_value(&entry).unwrap()],
            )
            .await
            .unwrap();
        assert_eq!(storage.clear("alice", CollectionKind::FoodEntries).await.unwrap(), 1);
    }

    #[test]
    fn test_parse_collection() {
        assert_eq!(parse_collection("diets").unwrap(), CollectionKind::Diets);
        assert_eq!(parse_collection("foodEntries").unwrap(), CollectionKind::FoodEntries);
        assert!(matches!(
            parse_collection("../etc"),
            Err(StorageError::InvalidCollection(_))
        ));
    }
}
