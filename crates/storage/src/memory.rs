//! In-memory object store.
//!
//! A complete `ObjectStorageClient` that keeps buckets, objects and open
//! multipart uploads in memory. Faults can be injected per part or per
//! operation, and every call that matters to the upload manager is
//! recorded, which makes it the backend of choice for tests and dry runs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use objstore_transfer_common::{md5_base64, md5_digest, multipart_md5, MD5_LEN};

use crate::error::StorageError;
use crate::traits::{CommittedPart, ObjectMetadata, ObjectStorageClient, UploadedPart};
use crate::types::ObjectTarget;

/// Calls observed by a [`MemoryObjectStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    /// Single-request `put_object` calls.
    pub single_puts: u32,
    /// Multipart sessions created.
    pub sessions_created: u32,
    /// Part numbers of every `upload_part` attempt, in call order.
    pub part_attempts: Vec<u32>,
    /// Part numbers stored successfully, in completion order.
    pub parts_completed: Vec<u32>,
    /// Part number lists of every successful commit.
    pub commits: Vec<Vec<u32>>,
    /// Upload IDs aborted.
    pub aborted: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct InjectedFailure {
    remaining: u32,
    retryable: bool,
}

#[derive(Debug, Default)]
struct Faults {
    part_failures: HashMap<u32, InjectedFailure>,
    rejected_checksums: HashSet<u32>,
    part_delays: HashMap<u32, Duration>,
    put_failures: Option<InjectedFailure>,
    fail_session_creation: bool,
    fail_commit: bool,
    wrong_multipart_md5: bool,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: Option<String>,
    metadata: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct Bucket {
    objects: BTreeMap<String, StoredObject>,
}

#[derive(Debug, Clone)]
struct StoredPart {
    data: Bytes,
    etag: String,
    md5: [u8; MD5_LEN],
}

#[derive(Debug)]
struct OpenUpload {
    target: ObjectTarget,
    content_type: Option<String>,
    metadata: HashMap<String, String>,
    parts: BTreeMap<u32, StoredPart>,
}

#[derive(Debug, Default)]
struct StoreState {
    buckets: HashMap<String, Bucket>,
    uploads: HashMap<String, OpenUpload>,
    next_upload: u64,
    faults: Faults,
    calls: CallLog,
}

/// `ObjectStorageClient` backed by process memory.
#[derive(Debug)]
pub struct MemoryObjectStore {
    namespace: String,
    auto_create_buckets: bool,
    state: Mutex<StoreState>,
}

impl MemoryObjectStore {
    /// Create an empty store. Buckets are created on first write.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            auto_create_buckets: true,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Require buckets to exist before objects are written to them.
    pub fn with_auto_create_buckets(mut self, enabled: bool) -> Self {
        self.auto_create_buckets = enabled;
        self
    }

    /// Fail the next `times` attempts of part `part_number`.
    pub fn fail_part(&self, part_number: u32, times: u32, retryable: bool) {
        self.lock().faults.part_failures.insert(
            part_number,
            InjectedFailure {
                remaining: times,
                retryable,
            },
        );
    }

    /// Reject the declared digest of part `part_number` on every attempt.
    pub fn reject_part_checksum(&self, part_number: u32) {
        self.lock().faults.rejected_checksums.insert(part_number);
    }

    /// Delay every attempt of part `part_number`.
    pub fn delay_part(&self, part_number: u32, delay: Duration) {
        self.lock().faults.part_delays.insert(part_number, delay);
    }

    /// Fail the next `times` single-request puts with a retryable error.
    pub fn fail_single_put(&self, times: u32) {
        self.lock().faults.put_failures = Some(InjectedFailure {
            remaining: times,
            retryable: true,
        });
    }

    /// Refuse to create multipart sessions.
    pub fn fail_session_creation(&self) {
        self.lock().faults.fail_session_creation = true;
    }

    /// Reject every commit.
    pub fn fail_commit(&self) {
        self.lock().faults.fail_commit = true;
    }

    /// Report a bogus multipart checksum from commits.
    pub fn report_wrong_multipart_md5(&self) {
        self.lock().faults.wrong_multipart_md5 = true;
    }

    /// Snapshot of the recorded calls.
    pub fn calls(&self) -> CallLog {
        self.lock().calls.clone()
    }

    /// Content of a stored object.
    pub fn object(&self, target: &ObjectTarget) -> Option<Bytes> {
        self.stored(target).map(|o| o.data)
    }

    /// Content type of a stored object.
    pub fn object_content_type(&self, target: &ObjectTarget) -> Option<String> {
        self.stored(target).and_then(|o| o.content_type)
    }

    /// User metadata of a stored object.
    pub fn object_metadata(&self, target: &ObjectTarget) -> Option<HashMap<String, String>> {
        self.stored(target).map(|o| o.metadata)
    }

    /// Whether a bucket exists.
    pub fn bucket_exists(&self, bucket: &str) -> bool {
        self.lock().buckets.contains_key(bucket)
    }

    /// Part numbers stored for an open upload, ascending.
    pub fn pending_parts(&self, upload_id: &str) -> Option<Vec<u32>> {
        self.lock()
            .uploads
            .get(upload_id)
            .map(|u| u.parts.keys().copied().collect())
    }

    /// Number of multipart uploads still open.
    pub fn open_uploads(&self) -> usize {
        self.lock().uploads.len()
    }

    fn stored(&self, target: &ObjectTarget) -> Option<StoredObject> {
        self.lock()
            .buckets
            .get(&target.bucket)
            .and_then(|b| b.objects.get(&target.object))
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_namespace(&self, namespace: &str) -> Result<(), StorageError> {
        if namespace != self.namespace {
            return Err(StorageError::NotFound {
                resource: format!("namespace {}", namespace),
            });
        }
        Ok(())
    }

    /// Resolve the bucket for a write, creating it when allowed.
    fn bucket_for_write<'s>(
        &self,
        state: &'s mut StoreState,
        target: &ObjectTarget,
    ) -> Result<&'s mut Bucket, StorageError> {
        self.check_namespace(&target.namespace)?;
        if self.auto_create_buckets {
            return Ok(state.buckets.entry(target.bucket.clone()).or_default());
        }
        state
            .buckets
            .get_mut(&target.bucket)
            .ok_or_else(|| StorageError::NotFound {
                resource: format!("bucket {}", target.bucket),
            })
    }
}

fn take_injected(failure: &mut Option<InjectedFailure>) -> Option<bool> {
    match failure {
        Some(f) if f.remaining > 0 => {
            f.remaining -= 1;
            Some(f.retryable)
        }
        _ => None,
    }
}

fn injected_error(resource: String, retryable: bool) -> StorageError {
    StorageError::NetworkError {
        message: format!("injected failure for {}", resource),
        retryable,
    }
}

fn check_digest(resource: &str, declared: Option<&str>, actual: &str) -> Result<(), StorageError> {
    match declared {
        Some(declared) if declared != actual => Err(StorageError::ChecksumMismatch {
            resource: resource.to_string(),
            message: format!("BadDigest: declared {}, computed {}", declared, actual),
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl ObjectStorageClient for MemoryObjectStore {
    async fn get_namespace(&self) -> Result<String, StorageError> {
        Ok(self.namespace.clone())
    }

    async fn create_bucket(
        &self,
        namespace: &str,
        bucket: &str,
        _metadata: Option<&HashMap<String, String>>,
    ) -> Result<(), StorageError> {
        self.check_namespace(namespace)?;
        let mut state = self.lock();
        if state.buckets.contains_key(bucket) {
            return Err(StorageError::Other {
                message: format!("BucketAlreadyExists: {}", bucket),
            });
        }
        state.buckets.insert(bucket.to_string(), Bucket::default());
        Ok(())
    }

    async fn delete_bucket(&self, namespace: &str, bucket: &str) -> Result<(), StorageError> {
        self.check_namespace(namespace)?;
        let mut state = self.lock();
        match state.buckets.get(bucket) {
            None => Err(StorageError::NotFound {
                resource: format!("bucket {}", bucket),
            }),
            Some(b) if !b.objects.is_empty() => Err(StorageError::Other {
                message: format!("BucketNotEmpty: {}", bucket),
            }),
            Some(_) => {
                state.buckets.remove(bucket);
                Ok(())
            }
        }
    }

    async fn put_object(
        &self,
        target: &ObjectTarget,
        body: Bytes,
        content_md5: Option<&str>,
        content_type: Option<&str>,
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<ObjectMetadata, StorageError> {
        let mut state = self.lock();
        state.calls.single_puts += 1;

        if let Some(retryable) = take_injected(&mut state.faults.put_failures) {
            return Err(injected_error(target.to_string(), retryable));
        }

        let md5: String = md5_base64(&body);
        check_digest(&target.to_string(), content_md5, &md5)?;

        let bucket = self.bucket_for_write(&mut state, target)?;
        bucket.objects.insert(
            target.object.clone(),
            StoredObject {
                data: body,
                content_type: content_type.map(str::to_string),
                metadata: metadata.cloned().unwrap_or_default(),
            },
        );

        Ok(ObjectMetadata {
            etag: Some(format!("\"{}\"", md5)),
            content_md5: Some(md5),
            multipart_md5: None,
            version_id: None,
        })
    }

    async fn delete_object(&self, target: &ObjectTarget) -> Result<(), StorageError> {
        self.check_namespace(&target.namespace)?;
        let mut state = self.lock();
        let removed = state
            .buckets
            .get_mut(&target.bucket)
            .and_then(|b| b.objects.remove(&target.object));
        match removed {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound {
                resource: target.to_string(),
            }),
        }
    }

    async fn create_multipart_upload(
        &self,
        target: &ObjectTarget,
        content_type: Option<&str>,
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<String, StorageError> {
        let mut state = self.lock();
        if state.faults.fail_session_creation {
            return Err(StorageError::AccessDenied {
                resource: target.to_string(),
                message: "injected session creation failure".into(),
            });
        }
        self.bucket_for_write(&mut state, target)?;

        state.next_upload += 1;
        let upload_id: String = format!("upload-{:06}", state.next_upload);
        state.uploads.insert(
            upload_id.clone(),
            OpenUpload {
                target: target.clone(),
                content_type: content_type.map(str::to_string),
                metadata: metadata.cloned().unwrap_or_default(),
                parts: BTreeMap::new(),
            },
        );
        state.calls.sessions_created += 1;
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
        let resource: String = format!("part {} of {}", part_number, upload_id);

        let delay: Option<Duration> = {
            let mut state = self.lock();
            state.calls.part_attempts.push(part_number);
            state.faults.part_delays.get(&part_number).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        let mut failure: Option<InjectedFailure> = state.faults.part_failures.get(&part_number).copied();
        if let Some(retryable) = take_injected(&mut failure) {
            if let Some(f) = failure {
                state.faults.part_failures.insert(part_number, f);
            }
            return Err(injected_error(resource, retryable));
        }

        let digest: [u8; MD5_LEN] = md5_digest(&body);
        let md5: String = md5_base64(&body);
        if content_md5.is_some() && state.faults.rejected_checksums.contains(&part_number) {
            return Err(StorageError::ChecksumMismatch {
                resource,
                message: "BadDigest: injected".into(),
            });
        }
        check_digest(&resource, content_md5, &md5)?;

        let upload = state
            .uploads
            .get_mut(upload_id)
            .filter(|u| &u.target == target)
            .ok_or_else(|| StorageError::NotFound {
                resource: format!("multipart upload {}", upload_id),
            })?;

        let etag: String = format!("\"{}\"", md5);
        upload.parts.insert(
            part_number,
            StoredPart {
                data: body,
                etag: etag.clone(),
                md5: digest,
            },
        );
        state.calls.parts_completed.push(part_number);
        Ok(etag)
    }

    async fn list_uploaded_parts(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
    ) -> Result<Vec<UploadedPart>, StorageError> {
        let state = self.lock();
        let upload = state
            .uploads
            .get(upload_id)
            .filter(|u| &u.target == target)
            .ok_or_else(|| StorageError::NotFound {
                resource: format!("multipart upload {}", upload_id),
            })?;

        Ok(upload
            .parts
            .iter()
            .map(|(number, part)| UploadedPart {
                part_number: *number,
                etag: part.etag.clone(),
                size: part.data.len() as u64,
                md5: Some(md5_base64(&part.data)),
            })
            .collect())
    }

    async fn complete_multipart_upload(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
        parts: &[CommittedPart],
    ) -> Result<ObjectMetadata, StorageError> {
        let mut state = self.lock();
        if state.faults.fail_commit {
            return Err(StorageError::Other {
                message: format!("injected commit failure for {}", upload_id),
            });
        }

        let upload = state
            .uploads
            .get(upload_id)
            .filter(|u| &u.target == target)
            .ok_or_else(|| StorageError::NotFound {
                resource: format!("multipart upload {}", upload_id),
            })?;

        if parts.is_empty() {
            return Err(StorageError::Other {
                message: "MalformedXML: no parts listed".into(),
            });
        }
        if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
            return Err(StorageError::Other {
                message: "InvalidPartOrder: parts must be ascending".into(),
            });
        }

        let mut data: Vec<u8> = Vec::new();
        let mut digests: Vec<[u8; MD5_LEN]> = Vec::with_capacity(parts.len());
        for committed in parts {
            let stored = upload
                .parts
                .get(&committed.part_number)
                .filter(|p| p.etag == committed.etag)
                .ok_or_else(|| StorageError::Other {
                    message: format!("InvalidPart: {}", committed.part_number),
                })?;
            data.extend_from_slice(&stored.data);
            digests.push(stored.md5);
        }

        let checksum: String = if state.faults.wrong_multipart_md5 {
            multipart_md5(&[[0u8; MD5_LEN]])
        } else {
            multipart_md5(&digests)
        };

        let object = StoredObject {
            data: Bytes::from(data),
            content_type: upload.content_type.clone(),
            metadata: upload.metadata.clone(),
        };
        state.uploads.remove(upload_id);

        let bucket = self.bucket_for_write(&mut state, target)?;
        bucket.objects.insert(target.object.clone(), object);
        state
            .calls
            .commits
            .push(parts.iter().map(|p| p.part_number).collect());

        Ok(ObjectMetadata {
            etag: Some(format!("\"{}\"", checksum)),
            content_md5: None,
            multipart_md5: Some(checksum),
            version_id: None,
        })
    }

    async fn abort_multipart_upload(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
    ) -> Result<(), StorageError> {
        let mut state = self.lock();
        let known: bool = state
            .uploads
            .get(upload_id)
            .is_some_and(|u| &u.target == target);
        if !known {
            return Err(StorageError::NotFound {
                resource: format!("multipart upload {}", upload_id),
            });
        }
        state.uploads.remove(upload_id);
        state.calls.aborted.push(upload_id.to_string());
        Ok(())
    }
}
