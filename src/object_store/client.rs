//! # Object Client Trait

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::DataResult;

/// Flat listing request (one round-trip)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListObjectsInput {
    pub bucket: String,
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub max_keys: Option<usize>,
    pub continuation_token: Option<String>,
}

/// One listed object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListObjectsOutput {
    pub contents: Vec<ObjectSummary>,
    /// Grouped key prefixes when a delimiter was given
    #[serde(default)]
    pub common_prefixes: Vec<String>,
    pub is_truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_continuation_token: Option<String>,
}

/// Version listing request (one round-trip)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListVersionsInput {
    pub bucket: String,
    pub prefix: Option<String>,
    pub max_keys: Option<usize>,
    pub key_marker: Option<String>,
    pub version_id_marker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: String,
    pub is_latest: bool,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListVersionsOutput {
    pub versions: Vec<ObjectVersion>,
    pub is_truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_key_marker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_version_id_marker: Option<String>,
}

/// Fully resolved object address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
    pub version_id: Option<String>,
}

/// Object metadata without the body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectHead {
    pub content_length: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    /// User-defined metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    /// Whether the delete created (or removed) a delete marker
    pub delete_marker: bool,
}

/// Operation a presigned URL grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignedOperation {
    #[serde(rename = "getObject")]
    Get,
    #[serde(rename = "putObject")]
    Put,
}

impl SignedOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignedOperation::Get => "getObject",
            SignedOperation::Put => "putObject",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresignInput {
    pub operation: SignedOperation,
    pub bucket: String,
    pub key: String,
    /// URL lifetime; the client default applies when absent
    pub expires_in_secs: Option<u64>,
    pub content_type: Option<String>,
}

/// Object store backend
pub trait ObjectClient: Send + Sync {
    fn list_objects(&self, input: ListObjectsInput) -> BoxFuture<'_, DataResult<ListObjectsOutput>>;

    fn list_object_versions(
        &self,
        input: ListVersionsInput,
    ) -> BoxFuture<'_, DataResult<ListVersionsOutput>>;

    fn head_object(&self, object: ObjectRef) -> BoxFuture<'_, DataResult<ObjectHead>>;

    fn delete_object(&self, object: ObjectRef) -> BoxFuture<'_, DataResult<DeleteOutput>>;

    /// Presigned URL for a single operation on one key
    fn presign(&self, input: PresignInput) -> BoxFuture<'_, DataResult<String>>;
}
