//! Postcard-based payload encoding with versioned envelopes.
//!
//! Every cached response (a single response shape, a page, or a full list) is
//! stored in this format:
//!
//! ```text
//! ┌─────────────────┬─────────────────┬──────────────────────────┐
//! │  MAGIC (4 bytes)│VERSION (4 bytes)│POSTCARD PAYLOAD (N bytes)│
//! └─────────────────┴─────────────────┴──────────────────────────┘
//!   "RKIT"              u32 (varint)       postcard::to_allocvec(T)
//! ```
//!
//! A payload that fails any check is never served: the orchestrator deletes
//! the entry and falls through to the store.
//!
//! # Example
//!
//! ```rust
//! use resource_kit::serialization::{decode_payload, encode_payload};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct GenreDto {
//!     id: i64,
//!     name: String,
//! }
//!
//! # fn main() -> resource_kit::Result<()> {
//! let dto = GenreDto { id: 1, name: "Comedia".to_string() };
//! let bytes = encode_payload(&dto)?;
//! let decoded: GenreDto = decode_payload(&bytes)?;
//! assert_eq!(dto, decoded);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Magic header for cached payloads: b"RKIT"
pub const PAYLOAD_MAGIC: [u8; 4] = *b"RKIT";

/// Current payload schema version.
///
/// **CRITICAL:** Increment when a response shape changes incompatibly (fields
/// added, removed, reordered or retyped). Entries written by the previous
/// version are then dropped on read instead of being misdecoded.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Versioned envelope around a cached payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PayloadEnvelope<T> {
    /// Magic header: must be b"RKIT"
    pub magic: [u8; 4],
    /// Schema version: must match CURRENT_SCHEMA_VERSION
    pub version: u32,
    /// The cached value
    pub payload: T,
}

impl<T> PayloadEnvelope<T> {
    /// Create a new envelope with current magic and version.
    pub fn new(payload: T) -> Self {
        Self {
            magic: PAYLOAD_MAGIC,
            version: CURRENT_SCHEMA_VERSION,
            payload,
        }
    }
}

/// Encode a value with envelope for cache storage.
///
/// # Errors
///
/// Returns `Error::SerializationError` if Postcard serialization fails.
pub fn encode_payload<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let envelope = PayloadEnvelope::new(value);
    postcard::to_allocvec(&envelope).map_err(|e| {
        log::error!("Payload serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })
}

/// Decode a value from cache storage with validation.
///
/// Checks, in order: envelope decodes, magic matches, version matches.
///
/// # Errors
///
/// - `Error::DeserializationError`: corrupted Postcard bytes
/// - `Error::InvalidCacheEntry`: invalid magic header
/// - `Error::VersionMismatch`: schema version mismatch
pub fn decode_payload<'de, T: Deserialize<'de>>(bytes: &'de [u8]) -> Result<T> {
    let envelope: PayloadEnvelope<T> = postcard::from_bytes(bytes).map_err(|e| {
        log::warn!("Payload deserialization failed: {}", e);
        Error::DeserializationError(e.to_string())
    })?;

    if envelope.magic != PAYLOAD_MAGIC {
        log::warn!(
            "Invalid cache entry: expected magic {:?}, got {:?}",
            PAYLOAD_MAGIC,
            envelope.magic
        );
        return Err(Error::InvalidCacheEntry(format!(
            "Invalid magic: expected {:?}, got {:?}",
            PAYLOAD_MAGIC, envelope.magic
        )));
    }

    if envelope.version != CURRENT_SCHEMA_VERSION {
        log::warn!(
            "Cache version mismatch: expected {}, got {}",
            CURRENT_SCHEMA_VERSION,
            envelope.version
        );
        return Err(Error::VersionMismatch {
            expected: CURRENT_SCHEMA_VERSION,
            found: envelope.version,
        });
    }

    Ok(envelope.payload)
}
