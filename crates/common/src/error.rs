use std::error::Error as StdError;

/// Failures turning a session into a stored payload and back.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to serialize session: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to parse session payload: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("compression failed: {0}")]
    Compress(#[source] std::io::Error),

    #[error("decompression failed: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("stored payload is not a binary blob")]
    NotBinary,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decoded session is not a JSON object")]
    NotAnObject,

    #[error("codec task failed: {0}")]
    Task(String),
}

/// Failures talking to the key-value backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),

    #[error("invalid table name {0:?}: use letters, digits, '_' or '-'")]
    InvalidTable(String),

    #[error("failed to encode stored value: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode stored value for key {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn backend(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Any failure inside a session lifecycle operation.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Short label used in logs and metric tags.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Codec(_) => "codec",
            Self::Store(_) => "store",
        }
    }
}
