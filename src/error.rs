//! # Data Access Errors
//!
//! Error type shared by the compiler, pagination engine, mappers and
//! connectors. Every failure surfaces to the immediate caller; nothing
//! here is retried.

use thiserror::Error;

/// Result type for data access operations
pub type DataResult<T> = Result<T, DataError>;

/// Data access errors
#[derive(Debug, Clone, Error)]
pub enum DataError {
    // Collaborator errors
    #[error("Backend failure: {0}")]
    Backend(String),

    #[error("Crypto failure: {0}")]
    Crypto(String),

    // Cursor errors
    #[error("Invalid cursor: {0}")]
    CursorDecode(String),

    #[error("Cursor encoding failed: {0}")]
    CursorEncode(String),

    // Mapping errors
    #[error("Role '{role}' is singular but received more than one record")]
    CardinalityMismatch { role: String },

    #[error("Record is missing field: {0}")]
    MissingField(String),

    #[error("Transform of field '{field}' failed: {message}")]
    Transform { field: String, message: String },

    // Ambient
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DataError {
    /// Create a backend failure
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a crypto failure
    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }

    /// Create a cursor decode failure
    pub fn cursor_decode(msg: impl Into<String>) -> Self {
        Self::CursorDecode(msg.into())
    }

    /// Create a transform failure for a field
    pub fn transform(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Transform {
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "AERODATA_BACKEND_FAILURE",
            Self::Crypto(_) => "AERODATA_CRYPTO_FAILURE",
            Self::CursorDecode(_) => "AERODATA_CURSOR_DECODE",
            Self::CursorEncode(_) => "AERODATA_CURSOR_ENCODE",
            Self::CardinalityMismatch { .. } => "AERODATA_CARDINALITY_MISMATCH",
            Self::MissingField(_) => "AERODATA_MISSING_FIELD",
            Self::Transform { .. } => "AERODATA_TRANSFORM_FAILED",
            Self::Serialization(_) => "AERODATA_SERIALIZATION",
            Self::Config(_) => "AERODATA_CONFIG",
        }
    }

    /// Whether a caller-side retry could succeed.
    ///
    /// Only collaborator failures qualify; the retry itself belongs to
    /// the backend client.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

impl From<serde_json::Error> for DataError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
