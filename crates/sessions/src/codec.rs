//! Session ⇄ stored payload transform, with optional xz compression.

use std::{
    io::{Read, Write},
    sync::Arc,
};

use {
    async_trait::async_trait,
    serde_json::Value,
    xz2::{
        stream::{Check, Stream},
        write::XzEncoder,
    },
};

use {
    palaver_common::{CodecError, Session},
    palaver_config::CompressionConfig,
};

use crate::payload::{StoredPayload, binary_from_wire};

/// Pluggable compression backend.
#[async_trait]
pub trait Compressor: Send + Sync {
    async fn compress(&self, text: String, level: u32) -> Result<Vec<u8>, CodecError>;
    async fn decompress(&self, bytes: Vec<u8>, level: u32) -> Result<String, CodecError>;
}

/// LZMA compression in the xz container, run on tokio's blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct LzmaCompressor;

#[async_trait]
impl Compressor for LzmaCompressor {
    async fn compress(&self, text: String, level: u32) -> Result<Vec<u8>, CodecError> {
        tokio::task::spawn_blocking(move || {
            // `XzEncoder::new` panics on a preset outside 0..=9.
            let stream = Stream::new_easy_encoder(level, Check::Crc64)
                .map_err(|e| CodecError::Compress(std::io::Error::other(e)))?;
            let mut encoder = XzEncoder::new_stream(Vec::new(), stream);
            encoder
                .write_all(text.as_bytes())
                .map_err(CodecError::Compress)?;
            encoder.finish().map_err(CodecError::Compress)
        })
        .await
        .map_err(|e| CodecError::Task(e.to_string()))?
    }

    // The xz stream header carries everything the decoder needs.
    async fn decompress(&self, bytes: Vec<u8>, _level: u32) -> Result<String, CodecError> {
        tokio::task::spawn_blocking(move || {
            let mut text = String::new();
            xz2::read::XzDecoder::new(bytes.as_slice())
                .read_to_string(&mut text)
                .map_err(CodecError::Decompress)?;
            Ok(text)
        })
        .await
        .map_err(|e| CodecError::Task(e.to_string()))?
    }
}

#[derive(Clone)]
struct Compression {
    level: u32,
    compressor: Arc<dyn Compressor>,
}

/// Packs sessions for the store and unpacks them again.
///
/// Stored values carry no marker of their encoding: a codec can only read
/// back what a codec with the same compression setting wrote.
#[derive(Clone, Default)]
pub struct PayloadCodec {
    compression: Option<Compression>,
}

impl std::fmt::Debug for PayloadCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadCodec")
            .field("compressed", &self.is_compressed())
            .field("level", &self.compression.as_ref().map(|c| c.level))
            .finish()
    }
}

impl PayloadCodec {
    /// Store sessions as plain JSON values.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Store sessions as compressed JSON text.
    pub fn compressed(level: u32, compressor: Arc<dyn Compressor>) -> Self {
        Self {
            compression: Some(Compression { level, compressor }),
        }
    }

    pub fn from_config(config: &CompressionConfig) -> Self {
        if config.enabled {
            Self::compressed(config.level, Arc::new(LzmaCompressor))
        } else {
            Self::plain()
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.compression.is_some()
    }

    pub async fn pack(&self, session: &Session) -> Result<StoredPayload, CodecError> {
        let Some(compression) = &self.compression else {
            return Ok(StoredPayload::Native(Value::Object(session.clone())));
        };
        let text = serde_json::to_string(session).map_err(CodecError::Serialize)?;
        let bytes = compression
            .compressor
            .compress(text, compression.level)
            .await?;
        Ok(StoredPayload::Binary(bytes))
    }

    /// Decode a stored value as returned by a store's `read`.
    pub async fn unpack(&self, stored: Value) -> Result<Session, CodecError> {
        let value = match &self.compression {
            None => stored,
            Some(compression) => {
                let bytes = binary_from_wire(&stored)?;
                let text = compression
                    .compressor
                    .decompress(bytes, compression.level)
                    .await?;
                serde_json::from_str(&text).map_err(CodecError::Parse)?
            },
        };
        match value {
            Value::Object(session) => Ok(session),
            _ => Err(CodecError::NotAnObject),
        }
    }
}
