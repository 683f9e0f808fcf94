//! libSQL store: `KeyValueStore` over a local file or in-memory database.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;

use crate::error::StorageError;
use crate::store::migrations;
use crate::store::traits::KeyValueStore;

/// libSQL-backed key-value store.
///
/// Every key lives under a namespace so several profiles could share one
/// file. The binary always uses one namespace.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    namespace: String,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path, namespace: &str) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Open(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StorageError::Open(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db, namespace).await?;
        info!(path = %path.display(), namespace, "Store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory(namespace: &str) -> Result<Self, StorageError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StorageError::Open(format!("Failed to create in-memory database: {e}")))?;

        Self::from_database(db, namespace).await
    }

    async fn from_database(db: LibSqlDatabase, namespace: &str) -> Result<Self, StorageError> {
        let conn = db
            .connect()
            .map_err(|e| StorageError::Open(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
            namespace: namespace.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[async_trait]
impl KeyValueStore for LibSqlStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM kv_store WHERE namespace = ?1 AND key = ?2",
                params![self.namespace.as_str(), key],
            )
            .await
            .map_err(|e| StorageError::Query(format!("get: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value: String = row
                    .get(0)
                    .map_err(|e| StorageError::Query(format!("get: {e}")))?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(StorageError::Query(format!("get: {e}"))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO kv_store (namespace, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (namespace, key) DO UPDATE SET value = ?3, updated_at = ?4",
                params![self.namespace.as_str(), key, value, now],
            )
            .await
            .map_err(|e| StorageError::Query(format!("set: {e}")))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let count = self
            .conn
            .execute(
                "DELETE FROM kv_store WHERE namespace = ?1 AND key = ?2",
                params![self.namespace.as_str(), key],
            )
            .await
            .map_err(|e| StorageError::Query(format!("remove: {e}")))?;
        Ok(count > 0)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.conn
            .execute(
                "DELETE FROM kv_store WHERE namespace = ?1",
                params![self.namespace.as_str()],
            )
            .await
            .map_err(|e| StorageError::Query(format!("clear: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> LibSqlStore {
        LibSqlStore::new_memory("default").await.unwrap()
    }

    #[tokio::test]
    async fn kv_crud() {
        let store = test_store().await;

        assert!(store.get("user").await.unwrap().is_none());

        store.set("user", r#"{"name":"Ava"}"#).await.unwrap();
        assert_eq!(
            store.get("user").await.unwrap().as_deref(),
            Some(r#"{"name":"Ava"}"#)
        );

        store.set("user", r#"{"name":"Bo"}"#).await.unwrap();
        assert_eq!(
            store.get("user").await.unwrap().as_deref(),
            Some(r#"{"name":"Bo"}"#)
        );

        assert!(store.remove("user").await.unwrap());
        assert!(!store.remove("user").await.unwrap());
        assert!(store.get("user").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_only_touches_own_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.db");

        let a = LibSqlStore::new_local(&path, "a").await.unwrap();
        let b = LibSqlStore::new_local(&path, "b").await.unwrap();
        a.set("k", "from-a").await.unwrap();
        b.set("k", "from-b").await.unwrap();

        assert_eq!(a.get("k").await.unwrap().as_deref(), Some("from-a"));
        a.clear().await.unwrap();
        assert!(a.get("k").await.unwrap().is_none());
        assert_eq!(b.get("k").await.unwrap().as_deref(), Some("from-b"));
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mindos.db");

        {
            let store = LibSqlStore::new_local(&path, "default").await.unwrap();
            store.set("onboarding_complete", "true").await.unwrap();
        }

        let reopened = LibSqlStore::new_local(&path, "default").await.unwrap();
        assert_eq!(
            reopened.get("onboarding_complete").await.unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(reopened.namespace(), "default");
    }
}
