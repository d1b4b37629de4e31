//! Mapping context
//!
//! Per-call context handed to mappers and field transforms. Carries the
//! optional decrypt capability and free-form metadata (for example the
//! caller's claims) that transforms may consult.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::crypto::Decrypt;
use crate::error::DataResult;
use crate::record::Record;

/// Context carried through one projection or reconstruction call
#[derive(Clone)]
pub struct MapContext {
    /// Request ID for tracing
    pub request_id: Uuid,

    /// Metadata available to transforms
    pub metadata: HashMap<String, Value>,

    decryptor: Option<Arc<dyn Decrypt>>,
}

impl MapContext {
    /// Create a context without a decrypt capability
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            metadata: HashMap::new(),
            decryptor: None,
        }
    }

    /// Attach a decrypt capability
    pub fn with_decryptor(mut self, decryptor: Arc<dyn Decrypt>) -> Self {
        self.decryptor = Some(decryptor);
        self
    }

    /// Add metadata for transforms
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether a decrypt capability is attached
    pub fn can_decrypt(&self) -> bool {
        self.decryptor.is_some()
    }

    /// Decrypt `record` when a capability is attached, else return it as-is
    pub async fn decrypt(&self, record: Record) -> DataResult<Record> {
        match &self.decryptor {
            Some(decryptor) => decryptor.decrypt(record).await,
            None => Ok(record),
        }
    }
}

impl Default for MapContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MapContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapContext")
            .field("request_id", &self.request_id)
            .field("metadata", &self.metadata)
            .field("can_decrypt", &self.can_decrypt())
            .finish()
    }
}
