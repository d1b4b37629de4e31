//! Object store connector
//!
//! Listings return the raw backend response together with an opaque `last`
//! cursor: the base64 JSON of the continuation token (flat listings) or of
//! the key/version marker pair (version listings).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ObjectStoreConfig;
use crate::error::DataResult;
use crate::observability::{log_event, Event};
use crate::pagination::{decode_optional, encode_cursor};

use super::client::{
    DeleteOutput, ListObjectsInput, ListObjectsOutput, ListVersionsInput, ListVersionsOutput,
    ObjectClient, ObjectHead, ObjectRef, PresignInput, SignedOperation,
};

/// Listing request shared by flat and version listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRequest {
    /// Cursor from the previous listing
    #[serde(default)]
    pub last: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    /// Overrides the configured bucket
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    /// Ignored by version listings
    #[serde(default)]
    pub delimiter: Option<String>,
}

impl ListRequest {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn after(mut self, last: Option<String>) -> Self {
        self.last = last;
        self
    }
}

/// A listing page: the backend response and the cursor to the next one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
    pub data: T,
}

/// Address of one object; the configured bucket applies when `bucket` is absent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectLocator {
    #[serde(default)]
    pub bucket: Option<String>,
    pub key: String,
    #[serde(default)]
    pub version_id: Option<String>,
}

impl ObjectLocator {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn version(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }
}

/// Optional presign parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignOptions {
    #[serde(default)]
    pub expires_in_secs: Option<u64>,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Native resume position of a version listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionMarker {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_marker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id_marker: Option<String>,
}

/// Data-access connector over one bucket
#[derive(Clone)]
pub struct ObjectStoreConnector {
    config: ObjectStoreConfig,
    client: Arc<dyn ObjectClient>,
}

impl std::fmt::Debug for ObjectStoreConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreConnector")
            .field("config", &self.config)
            .finish()
    }
}

impl ObjectStoreConnector {
    pub fn new(config: ObjectStoreConfig, client: Arc<dyn ObjectClient>) -> Self {
        Self { config, client }
    }

    pub fn bucket_name(&self) -> &str {
        &self.config.bucket_name
    }

    fn bucket(&self, bucket: Option<&str>) -> String {
        bucket.unwrap_or(&self.config.bucket_name).to_string()
    }

    /// One page of keys
    pub async fn list_objects(&self, request: &ListRequest) -> DataResult<Listing<ListObjectsOutput>> {
        let input = ListObjectsInput {
            bucket: self.bucket(request.bucket.as_deref()),
            prefix: request.prefix.clone(),
            delimiter: request.delimiter.clone(),
            max_keys: request.limit,
            continuation_token: decode_optional(request.last.as_deref())?,
        };
        let bucket = input.bucket.clone();

        let data = self.client.list_objects(input).await?;
        let last = match (&data.next_continuation_token, data.is_truncated) {
            (Some(token), true) => Some(encode_cursor(token)?),
            _ => None,
        };

        log_event(
            Event::ObjectsListed,
            &[
                ("bucket", bucket.as_str()),
                ("objects", data.contents.len().to_string().as_str()),
                ("truncated", data.is_truncated.to_string().as_str()),
            ],
        );
        Ok(Listing { last, data })
    }

    /// One page of object versions
    pub async fn list_object_versions(
        &self,
        request: &ListRequest,
    ) -> DataResult<Listing<ListVersionsOutput>> {
        let marker: Option<VersionMarker> = decode_optional(request.last.as_deref())?;
        let (key_marker, version_id_marker) = match marker {
            Some(m) => (m.key_marker, m.version_id_marker),
            None => (None, None),
        };
        let input = ListVersionsInput {
            bucket: self.bucket(request.bucket.as_deref()),
            prefix: request.prefix.clone(),
            max_keys: request.limit,
            key_marker,
            version_id_marker,
        };
        let bucket = input.bucket.clone();

        let data = self.client.list_object_versions(input).await?;
        let last = if data.is_truncated {
            Some(encode_cursor(&VersionMarker {
                key_marker: data.next_key_marker.clone(),
                version_id_marker: data.next_version_id_marker.clone(),
            })?)
        } else {
            None
        };

        log_event(
            Event::ObjectsListed,
            &[
                ("bucket", bucket.as_str()),
                ("truncated", data.is_truncated.to_string().as_str()),
                ("versions", data.versions.len().to_string().as_str()),
            ],
        );
        Ok(Listing { last, data })
    }

    /// Presigned URL for `key` in the configured bucket
    pub async fn signed_url(
        &self,
        operation: SignedOperation,
        key: &str,
        options: SignOptions,
    ) -> DataResult<String> {
        let input = PresignInput {
            operation,
            bucket: self.config.bucket_name.clone(),
            key: key.to_string(),
            expires_in_secs: options.expires_in_secs,
            content_type: options.content_type,
        };

        let url = self.client.presign(input).await?;
        log_event(
            Event::UrlSigned,
            &[("key", key), ("operation", operation.as_str())],
        );
        Ok(url)
    }

    pub async fn head_object(&self, locator: &ObjectLocator) -> DataResult<ObjectHead> {
        self.client.head_object(self.resolve(locator)).await
    }

    pub async fn delete_object(&self, locator: &ObjectLocator) -> DataResult<DeleteOutput> {
        self.client.delete_object(self.resolve(locator)).await
    }

    fn resolve(&self, locator: &ObjectLocator) -> ObjectRef {
        ObjectRef {
            bucket: self.bucket(locator.bucket.as_deref()),
            key: locator.key.clone(),
            version_id: locator.version_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use crate::pagination::decode_cursor;
    use futures_util::future::BoxFuture;
    use std::sync::Mutex;

    /// Canned responses; records every request it receives
    #[derive(Default)]
    struct Recording {
        listings: Mutex<Vec<ListObjectsInput>>,
        version_listings: Mutex<Vec<ListVersionsInput>>,
        objects: Mutex<Vec<ObjectRef>>,
        presigns: Mutex<Vec<PresignInput>>,
        truncated: bool,
    }

    impl ObjectClient for Recording {
        fn list_objects(&self, input: ListObjectsInput) -> BoxFuture<'_, DataResult<ListObjectsOutput>> {
            self.listings.lock().unwrap().push(input);
            let output = ListObjectsOutput {
                is_truncated: self.truncated,
                next_continuation_token: self.truncated.then(|| "token-2".to_string()),
                ..Default::default()
            };
            Box::pin(async move { Ok(output) })
        }

        fn list_object_versions(
            &self,
            input: ListVersionsInput,
        ) -> BoxFuture<'_, DataResult<ListVersionsOutput>> {
            self.version_listings.lock().unwrap().push(input);
            let output = ListVersionsOutput {
                is_truncated: self.truncated,
                next_key_marker: Some("k2".to_string()),
                next_version_id_marker: Some("v2".to_string()),
                ..Default::default()
            };
            Box::pin(async move { Ok(output) })
        }

        fn head_object(&self, object: ObjectRef) -> BoxFuture<'_, DataResult<ObjectHead>> {
            self.objects.lock().unwrap().push(object);
            Box::pin(async { Ok(ObjectHead::default()) })
        }

        fn delete_object(&self, object: ObjectRef) -> BoxFuture<'_, DataResult<DeleteOutput>> {
            self.objects.lock().unwrap().push(object);
            Box::pin(async { Err(DataError::backend("AccessDenied")) })
        }

        fn presign(&self, input: PresignInput) -> BoxFuture<'_, DataResult<String>> {
            let url = format!("https://{}/{}?op={}", input.bucket, input.key, input.operation.as_str());
            self.presigns.lock().unwrap().push(input);
            Box::pin(async move { Ok(url) })
        }
    }

    fn connector(client: &Arc<Recording>) -> ObjectStoreConnector {
        ObjectStoreConnector::new(ObjectStoreConfig::with_bucket("b1"), client.clone())
    }

    #[tokio::test]
    async fn test_list_objects_cursor_round_trip() {
        let client = Arc::new(Recording {
            truncated: true,
            ..Default::default()
        });
        let store = connector(&client);

        let first = store.list_objects(&ListRequest::prefix("a/").limit(10)).await.unwrap();
        let last = first.last.unwrap();
        assert_eq!(decode_cursor::<String>(&last).unwrap(), "token-2");

        store
            .list_objects(&ListRequest::prefix("a/").after(Some(last)))
            .await
            .unwrap();

        let listings = client.listings.lock().unwrap();
        assert_eq!(listings[0].bucket, "b1");
        assert_eq!(listings[0].max_keys, Some(10));
        assert_eq!(listings[0].continuation_token, None);
        assert_eq!(listings[1].continuation_token.as_deref(), Some("token-2"));
    }

    #[tokio::test]
    async fn test_untruncated_listing_has_no_cursor() {
        let client = Arc::new(Recording::default());
        let out = connector(&client)
            .list_objects(&ListRequest::default())
            .await
            .unwrap();
        assert!(out.last.is_none());
    }

    #[tokio::test]
    async fn test_version_markers_round_trip() {
        let client = Arc::new(Recording {
            truncated: true,
            ..Default::default()
        });
        let store = connector(&client);

        let first = store.list_object_versions(&ListRequest::default()).await.unwrap();
        let last = first.last.unwrap();
        let marker: VersionMarker = decode_cursor(&last).unwrap();
        assert_eq!(marker.key_marker.as_deref(), Some("k2"));

        let request = ListRequest {
            bucket: Some("other".to_string()),
            last: Some(last),
            ..Default::default()
        };
        store.list_object_versions(&request).await.unwrap();

        let listings = client.version_listings.lock().unwrap();
        assert_eq!(listings[1].bucket, "other");
        assert_eq!(listings[1].key_marker.as_deref(), Some("k2"));
        assert_eq!(listings[1].version_id_marker.as_deref(), Some("v2"));
    }

    #[test]
    fn test_version_marker_wire_names() {
        let marker = VersionMarker {
            key_marker: Some("k".to_string()),
            version_id_marker: Some("v".to_string()),
        };
        assert_eq!(
            serde_json::to_string(&marker).unwrap(),
            r#"{"KeyMarker":"k","VersionIdMarker":"v"}"#
        );
    }

    #[tokio::test]
    async fn test_bad_cursor_is_rejected() {
        let client = Arc::new(Recording::default());
        let err = connector(&client)
            .list_objects(&ListRequest::default().after(Some("%%%".to_string())))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AERODATA_CURSOR_DECODE");
        assert!(client.listings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_signed_url_uses_configured_bucket() {
        let client = Arc::new(Recording::default());
        let url = connector(&client)
            .signed_url(SignedOperation::Put, "a/b.txt", SignOptions::default())
            .await
            .unwrap();
        assert_eq!(url, "https://b1/a/b.txt?op=putObject");
    }

    #[tokio::test]
    async fn test_object_calls_default_bucket() {
        let client = Arc::new(Recording::default());
        let store = connector(&client);

        store.head_object(&ObjectLocator::key("k").version("v1")).await.unwrap();
        let err = store.delete_object(&ObjectLocator::key("k")).await.unwrap_err();
        assert!(err.is_retryable());

        let objects = client.objects.lock().unwrap();
        assert_eq!(objects[0].bucket, "b1");
        assert_eq!(objects[0].version_id.as_deref(), Some("v1"));
        assert_eq!(objects[1].version_id, None);
    }
}
