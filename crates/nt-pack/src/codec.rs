//! Object codec: `base64(zstd(json(value)))`.
//!
//! The encoding is lossless for any JSON-shaped value but not byte-stable:
//! two encodings of the same value may differ if the compression level does.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DecodeStage, PackError, PackResult};

/// Default zstd compression level.
pub const DEFAULT_LEVEL: i32 = 3;

/// Encodes structured values as compressed, printable text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectData {
    level: i32,
}

impl ObjectData {
    pub fn new() -> Self {
        Self {
            level: DEFAULT_LEVEL,
        }
    }

    /// Codec using the given zstd level (clamped by zstd to its valid range).
    pub fn with_level(level: i32) -> Self {
        Self { level }
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    /// Serialize, compress and base64-encode `value`.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> PackResult<String> {
        let json = serde_json::to_vec(value).map_err(|e| PackError::Serialization(e.to_string()))?;
        let compressed = zstd::encode_all(json.as_slice(), self.level)
            .map_err(|e| PackError::CompressionFailed(e.to_string()))?;
        Ok(STANDARD.encode(compressed))
    }

    /// Reverse [`ObjectData::encode`]. Fails on any malformed stage.
    pub fn decode<T: DeserializeOwned>(&self, text: &str) -> PackResult<T> {
        let compressed = STANDARD.decode(text.trim()).map_err(|e| PackError::Decode {
            stage: DecodeStage::Base64,
            reason: e.to_string(),
        })?;
        let json = zstd::decode_all(compressed.as_slice()).map_err(|e| PackError::Decode {
            stage: DecodeStage::Decompress,
            reason: e.to_string(),
        })?;
        serde_json::from_slice(&json).map_err(|e| PackError::Decode {
            stage: DecodeStage::Parse,
            reason: e.to_string(),
        })
    }
}

impl Default for ObjectData {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode with the default codec.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> PackResult<String> {
    ObjectData::new().encode(value)
}

/// Decode with the default codec.
pub fn decode<T: DeserializeOwned>(text: &str) -> PackResult<T> {
    ObjectData::new().decode(text)
}
