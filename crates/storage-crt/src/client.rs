//! AWS SDK S3 client implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
};
use aws_sdk_s3::Client as S3Client;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use objstore_transfer_storage::{
    CommittedPart, ObjectMetadata, ObjectStorageClient, ObjectTarget, StorageError,
    StorageSettings, UploadedPart,
};

use crate::error::CrtError;

/// Region S3 treats as the default location; buckets there take no
/// location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// ObjectStorageClient implementation using AWS SDK for Rust.
///
/// S3 has no namespace concept; the namespace is taken from the settings
/// and reported back by `get_namespace`.
pub struct CrtStorageClient {
    /// The underlying S3 client.
    s3_client: S3Client,
    /// Namespace reported to callers.
    namespace: String,
    /// Region used as the location constraint for new buckets.
    region: String,
    /// Expected bucket owner for security validation.
    expected_bucket_owner: Option<String>,
}

impl CrtStorageClient {
    /// Create a new S3 storage client.
    ///
    /// # Arguments
    /// * `settings` - Region, endpoint, namespace and optional credentials
    ///
    /// # Returns
    /// A new S3 storage client.
    pub async fn new(settings: StorageSettings) -> Result<Self, StorageError> {
        let mut config_loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(settings.region.clone()));

        if let Some(ref endpoint) = settings.endpoint {
            config_loader = config_loader.endpoint_url(endpoint);
        }

        if let Some(ref creds) = settings.credentials {
            let credentials = Credentials::new(
                &creds.access_key_id,
                &creds.secret_access_key,
                creds.session_token.clone(),
                None,
                "objstore-transfer",
            );
            config_loader = config_loader.credentials_provider(credentials);
        }

        let sdk_config = config_loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.force_path_style)
            .build();

        log::debug!(
            "Created S3 client for region {} (endpoint: {})",
            settings.region,
            settings.endpoint.as_deref().unwrap_or("default")
        );

        Ok(Self {
            s3_client: S3Client::from_conf(s3_config),
            namespace: settings.namespace,
            region: settings.region,
            expected_bucket_owner: settings.expected_bucket_owner,
        })
    }

    /// Create a client from an existing S3Client (for testing).
    ///
    /// # Arguments
    /// * `s3_client` - Pre-configured S3 client
    /// * `namespace` - Namespace reported by `get_namespace`
    /// * `expected_bucket_owner` - Optional expected bucket owner
    pub fn from_client(
        s3_client: S3Client,
        namespace: impl Into<String>,
        expected_bucket_owner: Option<String>,
    ) -> Self {
        Self {
            s3_client,
            namespace: namespace.into(),
            region: DEFAULT_REGION.to_string(),
            expected_bucket_owner,
        }
    }

    fn check_namespace(&self, namespace: &str) -> Result<(), StorageError> {
        if namespace != self.namespace {
            return Err(StorageError::InvalidConfig {
                message: format!(
                    "namespace {} does not match configured namespace {}",
                    namespace, self.namespace
                ),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorageClient for CrtStorageClient {
    async fn get_namespace(&self) -> Result<String, StorageError> {
        Ok(self.namespace.clone())
    }

    async fn create_bucket(
        &self,
        namespace: &str,
        bucket: &str,
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<(), StorageError> {
        self.check_namespace(namespace)?;

        let mut request = self.s3_client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            let configuration = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build();
            request = request.create_bucket_configuration(configuration);
        }

        request
            .send()
            .await
            .map_err(|err| CrtError::from_sdk("CreateBucket", err))?;

        if metadata.is_some_and(|m| !m.is_empty()) {
            log::debug!("S3 buckets carry no metadata; ignoring metadata for {}", bucket);
        }
        log::info!("Created bucket {}", bucket);
        Ok(())
    }

    async fn delete_bucket(&self, namespace: &str, bucket: &str) -> Result<(), StorageError> {
        self.check_namespace(namespace)?;

        let mut request = self.s3_client.delete_bucket().bucket(bucket);
        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        request
            .send()
            .await
            .map_err(|err| CrtError::from_sdk("DeleteBucket", err))?;

        log::info!("Deleted bucket {}", bucket);
        Ok(())
    }

    async fn put_object(
        &self,
        target: &ObjectTarget,
        body: Bytes,
        content_md5: Option<&str>,
        content_type: Option<&str>,
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<ObjectMetadata, StorageError> {
        let mut request = self
            .s3_client
            .put_object()
            .bucket(&target.bucket)
            .key(&target.object)
            .body(ByteStream::from(body));

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        if let Some(md5) = content_md5 {
            request = request.content_md5(md5);
        }

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        if let Some(meta) = metadata {
            for (k, v) in meta {
                request = request.metadata(k, v);
            }
        }

        let output = request
            .send()
            .await
            .map_err(|err| CrtError::from_sdk("PutObject", err))?;

        log::debug!("Put object {}", target);
        let etag: Option<String> = output.e_tag().map(str::to_string);
        Ok(ObjectMetadata {
            content_md5: etag.as_deref().and_then(etag_to_md5_base64),
            etag,
            multipart_md5: None,
            version_id: output.version_id().map(str::to_string),
        })
    }

    async fn delete_object(&self, target: &ObjectTarget) -> Result<(), StorageError> {
        let mut request = self
            .s3_client
            .delete_object()
            .bucket(&target.bucket)
            .key(&target.object);

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        request
            .send()
            .await
            .map_err(|err| CrtError::from_sdk("DeleteObject", err))?;

        log::info!("Deleted object {}", target);
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        target: &ObjectTarget,
        content_type: Option<&str>,
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<String, StorageError> {
        let mut request = self
            .s3_client
            .create_multipart_upload()
            .bucket(&target.bucket)
            .key(&target.object);

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        if let Some(meta) = metadata {
            for (k, v) in meta {
                request = request.metadata(k, v);
            }
        }

        let output = request
            .send()
            .await
            .map_err(|err| CrtError::from_sdk("CreateMultipartUpload", err))?;

        let upload_id: String = output
            .upload_id()
            .map(str::to_string)
            .ok_or(CrtError::MissingField {
                operation: "CreateMultipartUpload",
                field: "UploadId",
            })?;
        log::debug!("Created multipart upload {} for {}", upload_id, target);
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
        content_md5: Option<&str>,
    ) -> Result<String, StorageError> {
        let mut request = self
            .s3_client
            .upload_part()
            .bucket(&target.bucket)
            .key(&target.object)
            .upload_id(upload_id)
            .part_number(part_number as i32)
            .body(ByteStream::from(body));

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        if let Some(md5) = content_md5 {
            request = request.content_md5(md5);
        }

        let output = request
            .send()
            .await
            .map_err(|err| CrtError::from_sdk("UploadPart", err))?;

        let etag: String = output.e_tag().map(str::to_string).ok_or(CrtError::MissingField {
            operation: "UploadPart",
            field: "ETag",
        })?;
        Ok(etag)
    }

    async fn list_uploaded_parts(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
    ) -> Result<Vec<UploadedPart>, StorageError> {
        let mut parts: Vec<UploadedPart> = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self
                .s3_client
                .list_parts()
                .bucket(&target.bucket)
                .key(&target.object)
                .upload_id(upload_id);

            if let Some(ref owner) = self.expected_bucket_owner {
                request = request.expected_bucket_owner(owner);
            }

            if let Some(ref marker) = marker {
                request = request.part_number_marker(marker);
            }

            let response = request
                .send()
                .await
                .map_err(|err| CrtError::from_sdk("ListParts", err))?;

            for part in response.parts() {
                let (Some(number), Some(etag)) = (part.part_number(), part.e_tag()) else {
                    continue;
                };
                parts.push(UploadedPart {
                    part_number: number as u32,
                    etag: etag.to_string(),
                    size: part.size().map(|s| s as u64).unwrap_or(0),
                    md5: etag_to_md5_base64(etag),
                });
            }

            match (response.is_truncated(), response.next_part_number_marker()) {
                (Some(true), Some(next)) => marker = Some(next.to_string()),
                _ => break,
            }
        }

        parts.sort_by_key(|p| p.part_number);
        Ok(parts)
    }

    async fn complete_multipart_upload(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
        parts: &[CommittedPart],
    ) -> Result<ObjectMetadata, StorageError> {
        let completed: Vec<CompletedPart> = parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number as i32)
                    .e_tag(&p.etag)
                    .build()
            })
            .collect();

        let mut request = self
            .s3_client
            .complete_multipart_upload()
            .bucket(&target.bucket)
            .key(&target.object)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            );

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        let output = request
            .send()
            .await
            .map_err(|err| CrtError::from_sdk("CompleteMultipartUpload", err))?;

        log::debug!("Completed multipart upload {} ({} parts)", upload_id, parts.len());
        let etag: Option<String> = output.e_tag().map(str::to_string);
        Ok(ObjectMetadata {
            multipart_md5: etag.as_deref().and_then(multipart_etag_to_md5),
            etag,
            content_md5: None,
            version_id: output.version_id().map(str::to_string),
        })
    }

    async fn abort_multipart_upload(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
    ) -> Result<(), StorageError> {
        let mut request = self
            .s3_client
            .abort_multipart_upload()
            .bucket(&target.bucket)
            .key(&target.object)
            .upload_id(upload_id);

        if let Some(ref owner) = self.expected_bucket_owner {
            request = request.expected_bucket_owner(owner);
        }

        request
            .send()
            .await
            .map_err(|err| CrtError::from_sdk("AbortMultipartUpload", err))?;

        log::info!("Aborted multipart upload {} for {}", upload_id, target);
        Ok(())
    }
}

/// Decode a 32-digit hex MD5 into raw bytes.
fn decode_hex_md5(hex: &str) -> Option<Vec<u8>> {
    if hex.len() != 32 || !hex.is_ascii() {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

/// Convert a plain S3 ETag (quoted hex MD5) to base64 MD5.
///
/// Returns `None` for ETags that are not content digests, such as those of
/// multipart or KMS-encrypted objects.
fn etag_to_md5_base64(etag: &str) -> Option<String> {
    decode_hex_md5(etag.trim_matches('"')).map(|raw| STANDARD.encode(raw))
}

/// Convert a multipart S3 ETag (`"<hex>-<count>"`) to `<base64>-<count>`.
fn multipart_etag_to_md5(etag: &str) -> Option<String> {
    let (hex, count) = etag.trim_matches('"').split_once('-')?;
    let count: u32 = count.parse().ok()?;
    decode_hex_md5(hex).map(|raw| format!("{}-{}", STANDARD.encode(raw), count))
}
