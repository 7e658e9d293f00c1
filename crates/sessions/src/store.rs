//! Storage abstraction for session records.

use {async_trait::async_trait, serde_json::Value};

use palaver_common::StoreError;

use crate::{key::SessionKey, payload::StoredPayload};

/// A record as read back from a store.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub key: SessionKey,
    /// The stored wire form: a native JSON value or a `{"B": ...}` wrapper.
    pub value: Value,
}

/// Point create/read/update/delete of session records.
///
/// Backends own their schema and connection handling. None of these retry.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a record. Overwrites when the key already exists.
    async fn create(&self, key: &SessionKey, payload: &StoredPayload) -> Result<(), StoreError>;

    /// Point lookup. A missing key is `Ok(None)`, not an error.
    async fn read(&self, key: &SessionKey) -> Result<Option<SessionRecord>, StoreError>;

    /// Replace the stored payload, inserting the record if it is missing.
    async fn update(&self, key: &SessionKey, payload: &StoredPayload) -> Result<(), StoreError>;

    /// Remove a record. Deleting a missing key succeeds.
    async fn delete(&self, key: &SessionKey) -> Result<(), StoreError>;
}
