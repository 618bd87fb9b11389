//! Record error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding a machine record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Serialization to JSON or binary format failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Deserialization from JSON or binary format failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Record format version is not supported by this build
    #[error("Unsupported record version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Record decoded but names a state or event outside the vocabulary
    #[error("Record validation failed: {0}")]
    ValidationFailed(String),
}
