use std::collections::HashMap;

use {async_trait::async_trait, serde_json::Value, tokio::sync::RwLock};

use palaver_common::StoreError;

use crate::{
    key::SessionKey,
    payload::StoredPayload,
    store::{SessionRecord, SessionStore},
};

/// In-process session store holding each record's wire form.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw wire value stored under `key`, if any.
    pub async fn get_raw(&self, key: &str) -> Option<Value> {
        self.records.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Store an arbitrary wire value, bypassing the codec.
    pub async fn insert_raw(&self, key: &str, value: Value) {
        self.records.write().await.insert(key.to_string(), value);
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, key: &SessionKey, payload: &StoredPayload) -> Result<(), StoreError> {
        self.insert_raw(key.as_str(), payload.to_wire()).await;
        Ok(())
    }

    async fn read(&self, key: &SessionKey) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.get_raw(key.as_str()).await.map(|value| SessionRecord {
            key: key.clone(),
            value,
        }))
    }

    async fn update(&self, key: &SessionKey, payload: &StoredPayload) -> Result<(), StoreError> {
        self.insert_raw(key.as_str(), payload.to_wire()).await;
        Ok(())
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), StoreError> {
        self.records.write().await.remove(key.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[tokio::test]
    async fn crud_cycle() {
        let store = MemoryStore::new();
        let key = SessionKey::for_conversation("7", "9");

        assert!(store.read(&key).await.unwrap().is_none());

        store
            .create(&key, &StoredPayload::Native(json!({})))
            .await
            .unwrap();
        assert_eq!(store.read(&key).await.unwrap().unwrap().value, json!({}));

        store
            .update(&key, &StoredPayload::Binary(vec![1, 2, 3]))
            .await
            .unwrap();
        assert_eq!(store.get_raw("7:9").await, Some(json!({ "B": "AQID" })));

        store.delete(&key).await.unwrap();
        assert!(store.is_empty().await);
        // Deleting again is fine.
        store.delete(&key).await.unwrap();
    }
}
