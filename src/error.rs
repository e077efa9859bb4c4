//! Error types for the CRUD orchestration layer.

use crate::record::Id;
use std::fmt;

/// Result type for resource operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for resource operations.
///
/// The orchestrator translates every store and cache failure into one of these
/// variants before it reaches the caller. Only `NotFound`, `ValidationError`
/// and `StoreError` ever escape a CRUD entry point; the cache-side variants are
/// absorbed (logged and counted) because a cache failure must not fail a
/// request.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// No record with the given identifier.
    ///
    /// Surfaced directly as a 404. Never retried and never triggers eviction.
    NotFound {
        /// Resource name from the descriptor (e.g. `"generos"`)
        resource: String,
        /// Identifier that was looked up
        id: Id,
    },

    /// Malformed pagination or input shape.
    ///
    /// Detected before any store or cache access.
    ValidationError(String),

    /// Failure reported by the entity store.
    ///
    /// Common causes:
    /// - Connectivity loss
    /// - Constraint violation (duplicate unique value)
    /// - Write conflict
    ///
    /// **Recovery:** none inside this crate. Retry policy belongs to the caller.
    StoreError(String),

    /// Cache backend failed to read, write or evict.
    ///
    /// Common causes:
    /// - Redis connection lost
    /// - Pool exhausted
    /// - Network timeout
    CacheError(String),

    /// Serialization failed when converting a payload to cache bytes.
    SerializationError(String),

    /// Deserialization failed when converting cache bytes to a payload.
    ///
    /// **Recovery:** the entry is deleted and the read falls through to the store.
    DeserializationError(String),

    /// Invalid cache entry: bad magic header or corrupted envelope.
    InvalidCacheEntry(String),

    /// Schema version mismatch between code and cached data.
    ///
    /// Expected during deployments; the entry is dropped and recomputed.
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from cached entry)
        found: u32,
    },

    /// Invalid process configuration.
    ConfigError(String),

    /// Generic error with custom message.
    Other(String),
}

impl Error {
    /// Build a `NotFound` for the given resource and identifier.
    pub fn not_found(resource: impl Into<String>, id: Id) -> Self {
        Error::NotFound {
            resource: resource.into(),
            id,
        }
    }

    /// Build a `StoreError` from any displayable cause.
    ///
    /// Store adapters use this to convert driver errors.
    pub fn store(cause: impl fmt::Display) -> Self {
        Error::StoreError(cause.to_string())
    }

    /// Build a `CacheError` from any displayable cause.
    pub fn cache(cause: impl fmt::Display) -> Self {
        Error::CacheError(cause.to_string())
    }

    /// True for failures that originate in the cache path (backend or codec).
    ///
    /// These never fail a request.
    pub fn is_cache_side(&self) -> bool {
        matches!(
            self,
            Error::CacheError(_)
                | Error::SerializationError(_)
                | Error::DeserializationError(_)
                | Error::InvalidCacheEntry(_)
                | Error::VersionMismatch { .. }
        )
    }

    /// Normalize an error returned by an entity store.
    ///
    /// Anything that is not already part of the request-facing taxonomy is
    /// reported opaquely as a `StoreError`.
    pub(crate) fn into_store_error(self) -> Self {
        match self {
            e @ (Error::StoreError(_) | Error::NotFound { .. } | Error::ValidationError(_)) => e,
            other => Error::StoreError(other.to_string()),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound { resource, id } => {
                write!(f, "Not found: {} with id {}", resource, id)
            }
            Error::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Error::StoreError(msg) => write!(f, "Store error: {}", msg),
            Error::CacheError(msg) => write!(f, "Cache error: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::InvalidCacheEntry(msg) => write!(f, "Invalid cache entry: {}", msg),
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Cache version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<postcard::Error> for Error {
    fn from(e: postcard::Error) -> Self {
        Error::DeserializationError(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::CacheError(format!("Eviction task failed: {}", e))
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::CacheError(format!("Redis error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ValidationError("Test".to_string());
        assert_eq!(err.to_string(), "Validation error: Test");

        let err = Error::not_found("generos", 7);
        assert_eq!(err.to_string(), "Not found: generos with id 7");
    }

    #[test]
    fn test_error_from_string() {
        let err: Error = "test error".into();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn test_cache_side_classification() {
        assert!(Error::cache("down").is_cache_side());
        assert!(Error::VersionMismatch {
            expected: 1,
            found: 2
        }
        .is_cache_side());
        assert!(!Error::store("down").is_cache_side());
        assert!(!Error::not_found("cines", 1).is_cache_side());
    }

    #[test]
    fn test_into_store_error_keeps_taxonomy() {
        let nf = Error::not_found("cines", 3);
        assert_eq!(nf.clone().into_store_error(), nf);

        let wrapped = Error::Other("socket closed".to_string()).into_store_error();
        assert!(matches!(wrapped, Error::StoreError(ref m) if m.contains("socket closed")));
    }
}
