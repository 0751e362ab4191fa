//! Shared data structures for storage and upload operations.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use objstore_transfer_common::{
    DEFAULT_PART_ATTEMPTS, DEFAULT_PART_SIZE, DEFAULT_UPLOAD_CONCURRENCY,
};
use serde::{Deserialize, Serialize};

use crate::error::UploadError;
use crate::source::UploadSource;
use crate::traits::{CommittedPart, ObjectMetadata};

/// Configuration settings for a storage client backend.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// Service region.
    pub region: String,
    /// Custom endpoint URL (S3-compatible services).
    pub endpoint: Option<String>,
    /// Namespace reported by the backend. S3 has no namespace concept, so
    /// the value is taken from configuration.
    pub namespace: String,
    /// Static credentials. `None` uses the default provider chain.
    pub credentials: Option<AwsCredentials>,
    /// Use path-style addressing instead of virtual-hosted buckets.
    pub force_path_style: bool,
    /// Expected bucket owner for security validation.
    pub expected_bucket_owner: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            region: "us-east-1".into(),
            endpoint: None,
            namespace: "default".into(),
            credentials: None,
            force_path_style: false,
            expected_bucket_owner: None,
        }
    }
}

/// Static access key credentials.
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// Retry settings for part uploads.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    /// Maximum number of attempts per part, including the first.
    pub max_attempts: u32,
    /// Initial backoff delay in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,
    /// Backoff multiplier (exponential backoff).
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_PART_ATTEMPTS,
            initial_backoff_ms: 100,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetrySettings {
    /// Settings that make a single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent: i32 = attempt.saturating_sub(1).min(63) as i32;
        let delay: f64 = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped: f64 = delay.min(self.max_backoff_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

/// Where an object lives: namespace, bucket and object name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectTarget {
    pub namespace: String,
    pub bucket: String,
    pub object: String,
}

impl ObjectTarget {
    /// Create a new target.
    pub fn new(
        namespace: impl Into<String>,
        bucket: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            bucket: bucket.into(),
            object: object.into(),
        }
    }
}

impl fmt::Display for ObjectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.bucket, self.object)
    }
}

/// Options controlling how the upload manager sends a payload.
///
/// # Example
///
/// ```ignore
/// let options = UploadOptions::default()
///     .with_part_size(64 * MIB)
///     .with_checksum_verification(true);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    /// Size of each part in bytes. The last part may be shorter.
    pub part_size: u64,
    /// Payloads larger than this go multipart. `None` means `part_size`.
    pub multipart_threshold: Option<u64>,
    /// Allow splitting large payloads into parts.
    pub allow_multipart_uploads: bool,
    /// Allow uploading parts concurrently (random-access sources only).
    pub allow_parallel_uploads: bool,
    /// Send part digests to the service for server-side validation.
    pub enable_checksum_verification: bool,
    /// Maximum parts in flight when parallel uploads are allowed.
    pub max_concurrency: usize,
    /// Per-part retry policy.
    pub retry: RetrySettings,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            multipart_threshold: None,
            allow_multipart_uploads: true,
            allow_parallel_uploads: true,
            enable_checksum_verification: false,
            max_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            retry: RetrySettings::default(),
        }
    }
}

impl UploadOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the part size.
    pub fn with_part_size(mut self, part_size: u64) -> Self {
        self.part_size = part_size;
        self
    }

    /// Set the size above which uploads go multipart.
    pub fn with_multipart_threshold(mut self, threshold: u64) -> Self {
        self.multipart_threshold = Some(threshold);
        self
    }

    /// Enable or disable multipart uploads.
    pub fn with_multipart(mut self, allow: bool) -> Self {
        self.allow_multipart_uploads = allow;
        self
    }

    /// Enable or disable parallel part uploads.
    pub fn with_parallel(mut self, allow: bool) -> Self {
        self.allow_parallel_uploads = allow;
        self
    }

    /// Enable or disable server-side checksum verification.
    pub fn with_checksum_verification(mut self, enable: bool) -> Self {
        self.enable_checksum_verification = enable;
        self
    }

    /// Set maximum concurrency for parallel part uploads.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the per-part retry policy.
    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// The effective multipart threshold.
    pub fn threshold(&self) -> u64 {
        self.multipart_threshold.unwrap_or(self.part_size)
    }

    /// Check the options are usable.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.part_size == 0 {
            return Err(UploadError::configuration("part size must be greater than zero"));
        }
        if self.max_concurrency == 0 {
            return Err(UploadError::configuration(
                "max concurrency must be greater than zero",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(UploadError::configuration(
                "retry max_attempts must be at least 1",
            ));
        }
        if self.retry.backoff_multiplier.is_nan() || self.retry.backoff_multiplier < 1.0 {
            return Err(UploadError::configuration(
                "retry backoff_multiplier must be at least 1.0",
            ));
        }
        Ok(())
    }
}

/// A payload to upload. Built by the caller and consumed by the manager.
#[derive(Debug)]
pub struct UploadRequest {
    /// Destination object.
    pub target: ObjectTarget,
    /// Content to send.
    pub source: UploadSource,
    /// Explicit content length; overrides what the source reports.
    pub content_length: Option<u64>,
    /// Content type stored with the object.
    pub content_type: Option<String>,
    /// User metadata stored with the object.
    pub metadata: Option<HashMap<String, String>>,
    /// Upload behaviour.
    pub options: UploadOptions,
}

impl UploadRequest {
    /// Create a request with default options.
    pub fn new(target: ObjectTarget, source: UploadSource) -> Self {
        Self {
            target,
            source,
            content_length: None,
            content_type: None,
            metadata: None,
            options: UploadOptions::default(),
        }
    }

    /// Declare the content length.
    pub fn with_content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set user metadata.
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set upload options.
    pub fn with_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }
}

/// How an upload was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadType {
    /// One whole-object request.
    SinglePart,
    /// A committed multipart session.
    Multipart,
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadResult {
    /// Single request or multipart.
    pub upload_type: UploadType,
    /// Destination object.
    pub target: ObjectTarget,
    /// Metadata the service returned for the finished object.
    pub object: ObjectMetadata,
    /// Upload ID of the committed session (multipart only).
    pub upload_id: Option<String>,
    /// Parts listed in the commit, ascending (multipart only).
    pub parts: Vec<CommittedPart>,
    /// Transfer statistics.
    pub stats: TransferStatistics,
}

/// Aggregated statistics for an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferStatistics {
    /// Parts sent in this call.
    pub parts_uploaded: u64,
    /// Parts skipped because the service already had them.
    pub parts_skipped: u64,
    /// Bytes sent in this call.
    pub bytes_uploaded: u64,
    /// Bytes skipped because the service already had them.
    pub bytes_skipped: u64,
    /// Retry attempts performed across all requests.
    pub retries: u64,
}

impl TransferStatistics {
    /// Record an uploaded part.
    pub fn record_uploaded(&mut self, size: u64) {
        self.parts_uploaded += 1;
        self.bytes_uploaded += size;
    }

    /// Record a skipped part.
    pub fn record_skipped(&mut self, size: u64) {
        self.parts_skipped += 1;
        self.bytes_skipped += size;
    }
}

/// Outcome of one part, delivered to the progress callback.
#[derive(Debug, Clone)]
pub struct PartProgress {
    /// Multipart upload the part belongs to.
    pub upload_id: String,
    /// 1-based part number.
    pub part_number: u32,
    /// Total parts, when the source length is known.
    pub total_parts: Option<u32>,
    /// Byte offset of the part within the source.
    pub offset: u64,
    /// Part length in bytes.
    pub size: u64,
    /// Base64 MD5 of the part content; empty if it could not be read.
    pub md5: String,
    /// ETag the service returned (success only).
    pub etag: Option<String>,
    /// Failure description (failure only).
    pub error: Option<String>,
}

impl PartProgress {
    /// Whether the part was uploaded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_target_display() {
        let target = ObjectTarget::new("ns", "bucket", "dir/file.bin");
        assert_eq!(target.to_string(), "ns/bucket/dir/file.bin");
    }

    #[test]
    fn test_upload_options_default() {
        let options = UploadOptions::default();
        assert_eq!(options.part_size, DEFAULT_PART_SIZE);
        assert_eq!(options.threshold(), DEFAULT_PART_SIZE);
        assert!(options.allow_multipart_uploads);
        assert!(options.allow_parallel_uploads);
        assert!(!options.enable_checksum_verification);
        assert_eq!(options.max_concurrency, DEFAULT_UPLOAD_CONCURRENCY);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_upload_options_threshold_override() {
        let options = UploadOptions::default()
            .with_part_size(100)
            .with_multipart_threshold(250);
        assert_eq!(options.threshold(), 250);
    }

    #[test]
    fn test_upload_options_validation() {
        assert!(UploadOptions::default().with_part_size(0).validate().is_err());
        assert!(UploadOptions::default().with_max_concurrency(0).validate().is_err());

        let no_attempts = RetrySettings {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(UploadOptions::default().with_retry(no_attempts).validate().is_err());
    }

    #[test]
    fn test_retry_backoff() {
        let retry = RetrySettings {
            max_attempts: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 1_000,
            backoff_multiplier: 2.0,
        };
        assert_eq!(retry.backoff_for(1), Duration::from_millis(100));
        assert_eq!(retry.backoff_for(2), Duration::from_millis(200));
        assert_eq!(retry.backoff_for(3), Duration::from_millis(400));
        assert_eq!(retry.backoff_for(10), Duration::from_millis(1_000));
    }

    #[test]
    fn test_transfer_statistics_records() {
        let mut stats = TransferStatistics::default();
        stats.record_uploaded(100);
        stats.record_skipped(200);

        assert_eq!(stats.parts_uploaded, 1);
        assert_eq!(stats.parts_skipped, 1);
        assert_eq!(stats.bytes_uploaded, 100);
        assert_eq!(stats.bytes_skipped, 200);
    }
}
