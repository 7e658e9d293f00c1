use {
    base64::{Engine, engine::general_purpose::STANDARD as BASE64},
    serde_json::{Value, json},
};

use palaver_common::CodecError;

/// Attribute name of the binary wrapper in the store's JSON wire form.
pub const BINARY_ATTR: &str = "B";

/// A packed session as handed to a store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredPayload {
    /// Uncompressed: the session object, stored as the backend's native JSON.
    Native(Value),
    /// Compressed: raw bytes, stored as `{"B": "<base64>"}`.
    Binary(Vec<u8>),
}

impl StoredPayload {
    /// Store wire form of the payload.
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Native(value) => value.clone(),
            Self::Binary(bytes) => json!({ BINARY_ATTR: BASE64.encode(bytes) }),
        }
    }

    /// Size of the payload as it will be stored.
    pub fn stored_len(&self) -> usize {
        match self {
            Self::Native(value) => value.to_string().len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }
}

/// Re-derive the compressed bytes from a stored value.
///
/// Backends hand binary attributes back either still wrapped as
/// `{"B": "<base64>"}` or already unwrapped to the bare base64 string.
pub fn binary_from_wire(value: &Value) -> Result<Vec<u8>, CodecError> {
    let encoded = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => match map.get(BINARY_ATTR) {
            Some(Value::String(s)) if map.len() == 1 => s.as_str(),
            _ => return Err(CodecError::NotBinary),
        },
        _ => return Err(CodecError::NotBinary),
    };
    Ok(BASE64.decode(encoded)?)
}
