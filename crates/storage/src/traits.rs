//! Storage traits/interfaces for object storage operations.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::types::{ObjectTarget, PartProgress};

/// Callback invoked once per finished part (uploaded or failed).
///
/// Runs synchronously on the worker that finished the part, so it must not
/// block. In parallel mode calls arrive in completion order, not part order.
pub trait PartProgressCallback: Send + Sync {
    /// Called with the outcome of one part.
    fn on_part(&self, progress: &PartProgress);
}

impl<F> PartProgressCallback for F
where
    F: Fn(&PartProgress) + Send + Sync,
{
    fn on_part(&self, progress: &PartProgress) {
        self(progress)
    }
}

/// Metadata the service returns for a stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Entity tag.
    pub etag: Option<String>,
    /// Base64 MD5 of the content (single-request uploads).
    pub content_md5: Option<String>,
    /// Multipart checksum, `<base64 md5 of part digests>-<count>`.
    pub multipart_md5: Option<String>,
    /// Version identifier, if versioning is enabled.
    pub version_id: Option<String>,
}

/// A part the service has acknowledged for an open multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    /// 1-based part number.
    pub part_number: u32,
    /// Entity tag returned when the part was stored.
    pub etag: String,
    /// Part size in bytes.
    pub size: u64,
    /// Base64 MD5, when the service reports it.
    pub md5: Option<String>,
}

/// A (part number, ETag) pair listed in the commit request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedPart {
    pub part_number: u32,
    pub etag: String,
}

/// Low-level object storage operations - implemented by each backend.
#[async_trait]
pub trait ObjectStorageClient: Send + Sync {
    /// Namespace the client operates in.
    async fn get_namespace(&self) -> Result<String, StorageError>;

    /// Create a bucket.
    async fn create_bucket(
        &self,
        namespace: &str,
        bucket: &str,
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<(), StorageError>;

    /// Delete an empty bucket.
    async fn delete_bucket(&self, namespace: &str, bucket: &str) -> Result<(), StorageError>;

    /// Upload a whole object in one request.
    ///
    /// When `content_md5` is given the service must reject content whose
    /// digest differs.
    async fn put_object(
        &self,
        target: &ObjectTarget,
        body: Bytes,
        content_md5: Option<&str>,
        content_type: Option<&str>,
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<ObjectMetadata, StorageError>;

    /// Delete an object.
    async fn delete_object(&self, target: &ObjectTarget) -> Result<(), StorageError>;

    /// Start a multipart upload and return its upload ID.
    async fn create_multipart_upload(
        &self,
        target: &ObjectTarget,
        content_type: Option<&str>,
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<String, StorageError>;

    /// Upload one part and return its ETag.
    ///
    /// When `content_md5` is given the service validates it and fails with
    /// `StorageError::ChecksumMismatch` on a mismatch.
    async fn upload_part(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
        content_md5: Option<&str>,
    ) -> Result<String, StorageError>;

    /// List the parts the service has acknowledged, ascending.
    ///
    /// Fails with `StorageError::NotFound` for unknown upload IDs.
    async fn list_uploaded_parts(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
    ) -> Result<Vec<UploadedPart>, StorageError>;

    /// Assemble the listed parts into the final object.
    async fn complete_multipart_upload(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
        parts: &[CommittedPart],
    ) -> Result<ObjectMetadata, StorageError>;

    /// Discard an open multipart upload and its parts.
    async fn abort_multipart_upload(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
    ) -> Result<(), StorageError>;
}
