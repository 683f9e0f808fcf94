//! `KeyValueStore` trait: the only persistence the onboarding flow needs.

use async_trait::async_trait;

use crate::error::StorageError;

/// Backend-agnostic string key-value store.
///
/// Injected into the onboarding controller and the session gate instead of
/// being reached ambiently.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, or `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or overwrite a value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a key. Returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Delete every key.
    async fn clear(&self) -> Result<(), StorageError>;
}
