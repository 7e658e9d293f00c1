//! Conversation session persistence.
//!
//! A [`SessionManager`] loads a session from a [`SessionStore`], creating an
//! empty one on first access, and writes it back after the request is
//! handled. Payloads pass through a [`PayloadCodec`] that can xz-compress
//! the serialized JSON. [`SessionMiddleware`] wires this around a request
//! handler.

pub mod codec;
pub mod context;
pub mod handle;
pub mod key;
pub mod manager;
pub mod middleware;
pub mod payload;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;

#[cfg(test)]
pub(crate) mod test_support;

pub use {
    codec::{Compressor, LzmaCompressor, PayloadCodec},
    context::{Chat, Sender, SessionContext, UpdateContext},
    handle::SessionHandle,
    key::SessionKey,
    manager::{ErrorHook, SessionManager, SessionOp},
    middleware::{KeyFn, SessionMiddleware, default_session_key},
    palaver_common::{CodecError, Session, SessionError, StoreError},
    payload::StoredPayload,
    store::{SessionRecord, SessionStore},
    store_memory::MemoryStore,
    store_sqlite::SqliteSessionStore,
};
