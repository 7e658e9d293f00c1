//! Store doubles shared by the manager and middleware tests.

use std::sync::Mutex;

use {async_trait::async_trait, serde_json::Value};

use palaver_common::{Session, StoreError};

use crate::{
    key::SessionKey,
    payload::StoredPayload,
    store::{SessionRecord, SessionStore},
    store_memory::MemoryStore,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(String, Value),
    Read(String),
    Update(String, Value),
    Delete(String),
}

/// Memory store that journals every call it receives.
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    calls: Mutex<Vec<Call>>,
}

impl RecordingStore {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn create(&self, key: &SessionKey, payload: &StoredPayload) -> Result<(), StoreError> {
        self.push(Call::Create(key.to_string(), payload.to_wire()));
        self.inner.create(key, payload).await
    }

    async fn read(&self, key: &SessionKey) -> Result<Option<SessionRecord>, StoreError> {
        self.push(Call::Read(key.to_string()));
        self.inner.read(key).await
    }

    async fn update(&self, key: &SessionKey, payload: &StoredPayload) -> Result<(), StoreError> {
        self.push(Call::Update(key.to_string(), payload.to_wire()));
        self.inner.update(key, payload).await
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), StoreError> {
        self.push(Call::Delete(key.to_string()));
        self.inner.delete(key).await
    }
}

/// A backend that is always down.
#[derive(Debug, Default)]
pub struct FailingStore;

fn unavailable() -> StoreError {
    StoreError::backend(std::io::Error::other("backend unavailable"))
}

#[async_trait]
impl SessionStore for FailingStore {
    async fn create(&self, _: &SessionKey, _: &StoredPayload) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn read(&self, _: &SessionKey) -> Result<Option<SessionRecord>, StoreError> {
        Err(unavailable())
    }

    async fn update(&self, _: &SessionKey, _: &StoredPayload) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn delete(&self, _: &SessionKey) -> Result<(), StoreError> {
        Err(unavailable())
    }
}

/// Writes reach the inner store, reads always fail.
#[derive(Debug, Default)]
pub struct ReadFailingStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl SessionStore for ReadFailingStore {
    async fn create(&self, key: &SessionKey, payload: &StoredPayload) -> Result<(), StoreError> {
        self.inner.create(key, payload).await
    }

    async fn read(&self, _: &SessionKey) -> Result<Option<SessionRecord>, StoreError> {
        Err(unavailable())
    }

    async fn update(&self, key: &SessionKey, payload: &StoredPayload) -> Result<(), StoreError> {
        self.inner.update(key, payload).await
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }
}

pub fn session(value: Value) -> Session {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}
