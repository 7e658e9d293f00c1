//! Types shared by every palaver crate: the in-memory session shape and the
//! error taxonomy used between the codec, the stores and the manager.

pub mod error;
pub mod types;

pub use {
    error::{CodecError, SessionError, StoreError},
    types::Session,
};
