//! # Obfuscation Codec
//!
//! Reversible transform between a structured document and an opaque text blob.
//!
//! Format (no header, no length prefix, no version tag):
//! 1. Serialize to compact JSON.
//! 2. XOR every byte with the shared key, key index wrapping modulo key length.
//! 3. Encode the result with the standard radix-64 alphabet (with padding).
//!
//! ## Not a security primitive
//!
//! The same key stream is applied to every document. Anyone holding one
//! plaintext/blob pair recovers the key stream for every blob of equal or
//! shorter length, and the key itself ships inside the binary. The codec only
//! keeps casual readers away from the stored data. Changing the transform
//! changes the on-disk and on-wire format and orphans existing blobs unless a
//! versioned migration is added alongside it.
//!
//! For documents whose JSON is pure ASCII the output is byte-identical to
//! blobs written by the browser build of the ledger.

use crate::{CofferError, primitives};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Keyed XOR + radix-64 codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObfuscationCodec {
    key: Vec<u8>,
}

impl Default for ObfuscationCodec {
    /// A codec using the compiled-in shared secret.
    fn default() -> Self {
        Self {
            key: primitives::SHARED_SECRET.as_bytes().to_vec(),
        }
    }
}

impl ObfuscationCodec {
    /// Create a codec with a custom key.
    ///
    /// Returns an error for an empty key (the key stream would be undefined).
    pub fn new(key: impl Into<Vec<u8>>) -> Result<Self, CofferError> {
        let key = key.into();
        if key.is_empty() {
            return Err(CofferError::SerializationError(
                "Codec key must not be empty".to_string(),
            ));
        }
        Ok(Self { key })
    }

    /// Apply the repeating-key XOR in place. Self-inverse.
    fn apply_key_stream(&self, bytes: &mut [u8]) {
        for (byte, key_byte) in bytes.iter_mut().zip(self.key.iter().cycle()) {
            *byte ^= key_byte;
        }
    }

    /// Encode any serializable document into an opaque blob.
    pub fn encode<T: Serialize + ?Sized>(&self, document: &T) -> Result<String, CofferError> {
        let mut bytes = serde_json::to_vec(document)
            .map_err(|e| CofferError::SerializationError(e.to_string()))?;
        self.apply_key_stream(&mut bytes);
        Ok(STANDARD.encode(bytes))
    }

    /// Decode a blob into structured data.
    ///
    /// Returns `None` (never an error, never a panic) when the input is empty,
    /// contains characters outside the alphabet, or does not yield valid JSON
    /// once the key stream is removed. Surrounding whitespace is ignored.
    #[must_use]
    pub fn decode(&self, blob: &str) -> Option<Value> {
        let mut bytes = self.unwrap_blob(blob)?;
        self.apply_key_stream(&mut bytes);
        serde_json::from_slice(&bytes).ok()
    }

    /// Decode a blob directly into a typed document.
    #[must_use]
    pub fn decode_as<T: DeserializeOwned>(&self, blob: &str) -> Option<T> {
        let mut bytes = self.unwrap_blob(blob)?;
        self.apply_key_stream(&mut bytes);
        serde_json::from_slice(&bytes).ok()
    }

    fn unwrap_blob(&self, blob: &str) -> Option<Vec<u8>> {
        let trimmed = blob.trim();
        if trimmed.is_empty() {
            return None;
        }
        STANDARD.decode(trimmed).ok()
    }
}

// =============================================================================
// TESTS
// =============================================================================
