//! Upload coordination for object storage.
//!
//! This module provides the high-level upload operation that works with any
//! `ObjectStorageClient` implementation. It handles:
//!
//! - Choosing between a single request and a multipart session
//! - Splitting the payload into fixed-size parts
//! - Parallel part uploads for random-access sources (bounded pool)
//! - Sequential part uploads for single-pass streams
//! - Per-part retries, MD5 digests and progress callbacks
//! - Resuming an interrupted session without re-sending stored parts
//! - Cancellation and explicit abort
//!
//! # Example
//!
//! ```ignore
//! use objstore_transfer_storage::{ObjectTarget, UploadManager, UploadRequest, UploadSource};
//!
//! let manager = UploadManager::new(&client).with_progress(&progress);
//! let request = UploadRequest::new(target, UploadSource::file("/data/big.bin"));
//! match manager.upload(request).await {
//!     Ok(result) => println!("stored {}", result.target),
//!     Err(e) if e.is_resumable() => {
//!         let session = e.into_session().unwrap();
//!         manager.resume_upload(&session, UploadSource::file("/data/big.bin"), options).await?;
//!     }
//!     Err(e) => return Err(e.into()),
//! }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use objstore_transfer_common::{decode_md5_base64, md5_base64, multipart_md5, MAX_PARTS, MD5_LEN};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::error::{StorageError, UploadError};
use crate::parts::{check_part_count, expected_part_count, plan_parts, upload_strategy, PartPlan, UploadStrategy};
use crate::retry::with_retry;
use crate::session::{MultipartUploadSession, SessionStatus};
use crate::source::{read_chunk, RangeReader, UploadSource};
use crate::traits::{ObjectMetadata, ObjectStorageClient, PartProgressCallback, UploadedPart};
use crate::types::{
    ObjectTarget, PartProgress, TransferStatistics, UploadOptions, UploadRequest, UploadResult,
    UploadType,
};

type StreamReader = Box<dyn AsyncRead + Send + Unpin>;

/// Uploads objects through any `ObjectStorageClient`.
pub struct UploadManager<'a, C: ObjectStorageClient + ?Sized> {
    /// The storage client for service operations.
    client: &'a C,
    /// Optional per-part progress callback.
    progress: Option<&'a dyn PartProgressCallback>,
    /// Optional cancellation signal.
    cancel: Option<CancellationToken>,
}

impl<'a, C: ObjectStorageClient + ?Sized> UploadManager<'a, C> {
    /// Create a new upload manager.
    ///
    /// # Arguments
    /// * `client` - Storage client for service operations
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            progress: None,
            cancel: None,
        }
    }

    /// Report every finished part to `callback`.
    ///
    /// # Arguments
    /// * `callback` - Receives one call per part outcome
    pub fn with_progress(mut self, callback: &'a dyn PartProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Stop scheduling new parts once `token` is cancelled.
    ///
    /// Parts already in flight finish; the session stays open and is
    /// returned in `UploadError::Cancelled`.
    ///
    /// # Arguments
    /// * `token` - Cancellation token shared with the caller
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Upload a payload.
    ///
    /// Payloads no larger than the multipart threshold (or any payload when
    /// multipart is disabled) go up in one request. Larger payloads open a
    /// multipart session, upload every part and commit them in ascending
    /// part order.
    ///
    /// # Arguments
    /// * `request` - Destination, source and upload options
    ///
    /// # Returns
    /// The committed object on success. Part failures and cancellation
    /// return an error carrying the open session for `resume_upload`.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadResult, UploadError> {
        let UploadRequest {
            target,
            source,
            content_length,
            content_type,
            metadata,
            options,
        } = request;

        options.validate()?;

        let reported: Option<u64> = source
            .content_length()
            .await
            .map_err(|e| UploadError::Source {
                message: e.to_string(),
            })?;

        let object = ObjectSpec {
            target,
            content_type,
            metadata,
        };

        if options.allow_parallel_uploads && !source.supports_random_access() {
            log::debug!("Stream source for {}; uploading parts sequentially", object.target);
        }

        match source {
            UploadSource::File(path) => {
                let length: u64 = ranged_length(content_length, reported)?;
                self.upload_ranged(object, RangeReader::File(path), length, &options)
                    .await
            }
            UploadSource::Bytes(data) => {
                let length: u64 = ranged_length(content_length, reported)?;
                self.upload_ranged(object, RangeReader::Bytes(data), length, &options)
                    .await
            }
            UploadSource::Stream { reader, .. } => {
                let length: Option<u64> = content_length.or(reported);
                self.upload_stream(object, reader, length, &options).await
            }
        }
    }

    /// Continue an interrupted multipart upload.
    ///
    /// Parts the service already holds are skipped when their size matches
    /// the part plan; everything else is uploaded, then the session is
    /// committed. The part size always comes from the session.
    ///
    /// # Arguments
    /// * `session` - Record returned by a failed or cancelled upload
    /// * `source` - The same content the upload was started with
    /// * `options` - Upload options; `part_size` is overridden by the session
    pub async fn resume_upload(
        &self,
        session: &MultipartUploadSession,
        source: UploadSource,
        options: UploadOptions,
    ) -> Result<UploadResult, UploadError> {
        let options: UploadOptions = options.with_part_size(session.part_size());
        options.validate()?;

        match session.status() {
            SessionStatus::Completed | SessionStatus::Aborted => {
                return Err(UploadError::configuration(format!(
                    "multipart upload {} is {:?} and cannot be resumed",
                    session.upload_id(),
                    session.status()
                )));
            }
            SessionStatus::Active | SessionStatus::ResumableFailed => {}
        }

        let target: &ObjectTarget = session.target();
        let upload_id: &str = session.upload_id();

        let listed: Vec<UploadedPart> = self
            .client
            .list_uploaded_parts(target, upload_id)
            .await
            .map_err(|source| match source {
                StorageError::NotFound { .. } => UploadError::ResumeNotFound {
                    upload_id: upload_id.to_string(),
                },
                source => UploadError::Resume {
                    upload_id: upload_id.to_string(),
                    source,
                },
            })?;
        let acknowledged: HashMap<u32, UploadedPart> =
            listed.into_iter().map(|p| (p.part_number, p)).collect();

        log::info!(
            "Resuming multipart upload {} for {} ({} parts already stored)",
            upload_id,
            target,
            acknowledged.len()
        );

        let reported: Option<u64> = source
            .content_length()
            .await
            .map_err(|e| UploadError::Source {
                message: e.to_string(),
            })?;

        match source {
            UploadSource::File(path) => {
                let length: u64 = ranged_length(None, reported)?;
                let fresh = MultipartUploadSession::new(upload_id, target.clone(), options.part_size, Some(length));
                self.run_ranged(fresh, RangeReader::File(path), length, &acknowledged, &options)
                    .await
            }
            UploadSource::Bytes(data) => {
                let length: u64 = ranged_length(None, reported)?;
                let fresh = MultipartUploadSession::new(upload_id, target.clone(), options.part_size, Some(length));
                self.run_ranged(fresh, RangeReader::Bytes(data), length, &acknowledged, &options)
                    .await
            }
            UploadSource::Stream { reader, length } => {
                if let Some(length) = length {
                    check_part_count(length, options.part_size)?;
                }
                let fresh = MultipartUploadSession::new(upload_id, target.clone(), options.part_size, length);
                let chunker = StreamChunker::new(reader, Bytes::new(), options.part_size);
                self.run_stream(fresh, chunker, length, &acknowledged, &options)
                    .await
            }
        }
    }

    /// Abort a multipart upload and discard its stored parts.
    ///
    /// # Arguments
    /// * `session` - The session to abort; marked `Aborted` on success
    pub async fn abort_upload(&self, session: &mut MultipartUploadSession) -> Result<(), UploadError> {
        if session.status() == SessionStatus::Completed {
            return Err(UploadError::configuration(format!(
                "multipart upload {} is already committed",
                session.upload_id()
            )));
        }

        self.client
            .abort_multipart_upload(session.target(), session.upload_id())
            .await
            .map_err(|source| UploadError::Abort {
                upload_id: session.upload_id().to_string(),
                source,
            })?;

        log::info!(
            "Aborted multipart upload {} for {}",
            session.upload_id(),
            session.target()
        );
        session.set_status(SessionStatus::Aborted);
        Ok(())
    }

    /// Upload a file or in-memory payload of known length.
    async fn upload_ranged(
        &self,
        object: ObjectSpec,
        reader: RangeReader,
        length: u64,
        options: &UploadOptions,
    ) -> Result<UploadResult, UploadError> {
        if self.is_cancelled() {
            return Err(UploadError::Cancelled { session: None });
        }

        match upload_strategy(length, options) {
            UploadStrategy::SingleRequest => {
                let body: Bytes = reader
                    .read_range(0, length)
                    .await
                    .map_err(|e| UploadError::Source {
                        message: e.to_string(),
                    })?;
                self.put_single(object, body, options).await
            }
            UploadStrategy::Multipart => {
                check_part_count(length, options.part_size)?;
                let upload_id: String = self.create_session(&object).await?;
                let session = MultipartUploadSession::new(
                    upload_id,
                    object.target,
                    options.part_size,
                    Some(length),
                );
                self.run_ranged(session, reader, length, &HashMap::new(), options)
                    .await
            }
        }
    }

    /// Upload a single-pass stream.
    async fn upload_stream(
        &self,
        object: ObjectSpec,
        mut reader: StreamReader,
        length: Option<u64>,
        options: &UploadOptions,
    ) -> Result<UploadResult, UploadError> {
        if self.is_cancelled() {
            return Err(UploadError::Cancelled { session: None });
        }

        let carry: Bytes = match length {
            _ if !options.allow_multipart_uploads => {
                let body: Bytes = read_all(&mut reader).await?;
                return self.put_single(object, body, options).await;
            }
            Some(length) => match upload_strategy(length, options) {
                UploadStrategy::SingleRequest => {
                    let body: Bytes = read_all(&mut reader).await?;
                    return self.put_single(object, body, options).await;
                }
                UploadStrategy::Multipart => {
                    check_part_count(length, options.part_size)?;
                    Bytes::new()
                }
            },
            None => {
                // Buffer one byte past the threshold to learn which side of it we are on.
                let limit: u64 = options.threshold().saturating_add(1);
                let head: Bytes = read_chunk(&mut reader, limit)
                    .await
                    .map_err(|e| UploadError::Source {
                        message: e.to_string(),
                    })?;
                if (head.len() as u64) <= options.threshold() {
                    return self.put_single(object, head, options).await;
                }
                head
            }
        };

        let upload_id: String = self.create_session(&object).await?;
        let session = MultipartUploadSession::new(upload_id, object.target, options.part_size, length);
        let chunker = StreamChunker::new(reader, carry, options.part_size);
        self.run_stream(session, chunker, length, &HashMap::new(), options)
            .await
    }

    /// Send the whole payload in one request.
    async fn put_single(
        &self,
        object: ObjectSpec,
        body: Bytes,
        options: &UploadOptions,
    ) -> Result<UploadResult, UploadError> {
        let size: u64 = body.len() as u64;
        let md5: Option<String> = options
            .enable_checksum_verification
            .then(|| md5_base64(&body));

        let client: &C = self.client;
        let target: &ObjectTarget = &object.target;
        let content_md5: Option<&str> = md5.as_deref();
        let content_type: Option<&str> = object.content_type.as_deref();
        let metadata: Option<&HashMap<String, String>> = object.metadata.as_ref();
        let label: String = format!("put {}", target);

        let retried = with_retry(&options.retry, &label, move || {
            client.put_object(target, body.clone(), content_md5, content_type, metadata)
        })
        .await;

        let stored: ObjectMetadata = retried.result.map_err(|source| UploadError::SinglePartUpload {
            target: target.to_string(),
            source,
        })?;

        log::info!("Uploaded {} ({} bytes) in a single request", target, size);

        let mut stats = TransferStatistics::default();
        stats.record_uploaded(size);
        stats.retries = u64::from(retried.retries);

        Ok(UploadResult {
            upload_type: UploadType::SinglePart,
            target: object.target,
            object: stored,
            upload_id: None,
            parts: Vec::new(),
            stats,
        })
    }

    /// Open a multipart session on the service.
    async fn create_session(&self, object: &ObjectSpec) -> Result<String, UploadError> {
        let upload_id: String = self
            .client
            .create_multipart_upload(
                &object.target,
                object.content_type.as_deref(),
                object.metadata.as_ref(),
            )
            .await
            .map_err(|source| UploadError::SessionCreation {
                target: object.target.to_string(),
                source,
            })?;

        log::info!("Created multipart upload {} for {}", upload_id, object.target);
        Ok(upload_id)
    }

    /// Upload the parts of a random-access payload, then commit.
    async fn run_ranged(
        &self,
        mut session: MultipartUploadSession,
        reader: RangeReader,
        length: u64,
        acknowledged: &HashMap<u32, UploadedPart>,
        options: &UploadOptions,
    ) -> Result<UploadResult, UploadError> {
        check_part_count(length, options.part_size)?;

        let plans: Vec<PartPlan> = plan_parts(length, options.part_size);
        let mut stats = TransferStatistics::default();
        let mut pending: Vec<PartPlan> = Vec::with_capacity(plans.len());

        for plan in &plans {
            match acknowledged.get(&plan.number) {
                Some(stored) if stored.size == plan.length => {
                    session.record_acknowledged(*plan, stored);
                    stats.record_skipped(plan.length);
                }
                _ => {
                    session.track(*plan);
                    pending.push(*plan);
                }
            }
        }

        let upload_id: String = session.upload_id().to_string();
        let target: ObjectTarget = session.target().clone();
        let job = PartJob {
            target: &target,
            upload_id: &upload_id,
            total_parts: Some(plans.len() as u32),
            options,
        };

        let concurrency: usize = if options.allow_parallel_uploads {
            options.max_concurrency.max(1)
        } else {
            1
        };

        log::debug!(
            "Uploading {} of {} parts for {} (concurrency {})",
            pending.len(),
            plans.len(),
            upload_id,
            concurrency
        );

        let state = Mutex::new(UploadState {
            session,
            stats,
            failure: None,
        });
        let halted = AtomicBool::new(false);

        stream::iter(pending)
            .map(|plan| {
                let job = &job;
                let reader = &reader;
                let state = &state;
                let halted = &halted;

                async move {
                    if halted.load(Ordering::Relaxed) || self.is_cancelled() {
                        return;
                    }

                    match reader.read_range(plan.offset, plan.length).await {
                        Ok(body) => self.send_part(job, state, halted, plan, body).await,
                        Err(error) => self.record_failure(job, state, halted, plan, error),
                    }
                }
            })
            .buffer_unordered(concurrency)
            .collect::<Vec<()>>()
            .await;

        let state: UploadState = state.into_inner().unwrap_or_else(PoisonError::into_inner);
        self.finish(state, options).await
    }

    /// Upload the parts of a stream in order, then commit.
    async fn run_stream(
        &self,
        session: MultipartUploadSession,
        mut chunker: StreamChunker,
        length: Option<u64>,
        acknowledged: &HashMap<u32, UploadedPart>,
        options: &UploadOptions,
    ) -> Result<UploadResult, UploadError> {
        let upload_id: String = session.upload_id().to_string();
        let target: ObjectTarget = session.target().clone();
        let job = PartJob {
            target: &target,
            upload_id: &upload_id,
            total_parts: length.map(|l| expected_part_count(l, options.part_size) as u32),
            options,
        };

        let state = Mutex::new(UploadState {
            session,
            stats: TransferStatistics::default(),
            failure: None,
        });
        let halted = AtomicBool::new(false);

        let mut number: u32 = 1;
        let mut offset: u64 = 0;
        let mut exhausted: bool = false;

        while !halted.load(Ordering::Relaxed) && !self.is_cancelled() {
            let body: Bytes = match chunker.next_part().await {
                Ok(body) => body,
                Err(error) => {
                    let plan = PartPlan {
                        number,
                        offset,
                        length: 0,
                    };
                    self.record_failure(&job, &state, &halted, plan, error);
                    break;
                }
            };
            if body.is_empty() {
                exhausted = true;
                break;
            }
            let plan = PartPlan {
                number,
                offset,
                length: body.len() as u64,
            };

            if u64::from(number) > MAX_PARTS {
                let error = StorageError::InvalidConfig {
                    message: format!("stream needs more than {} parts", MAX_PARTS),
                };
                self.record_failure(&job, &state, &halted, plan, error);
                break;
            }

            match acknowledged.get(&number) {
                Some(stored) if stored_matches(stored, &body) => {
                    let mut guard = lock(&state);
                    guard.session.record_acknowledged(plan, stored);
                    guard.stats.record_skipped(plan.length);
                }
                _ => {
                    lock(&state).session.track(plan);
                    self.send_part(&job, &state, &halted, plan, body).await;
                }
            }

            offset += plan.length;
            number += 1;
        }

        let mut state: UploadState = state.into_inner().unwrap_or_else(PoisonError::into_inner);
        if exhausted && state.failure.is_none() {
            if number == 1 && acknowledged.is_empty() {
                // No part was stored; drop the open upload.
                self.discard_session(&target, &upload_id).await;
                return Err(UploadError::Source {
                    message: format!("stream for {} ended before any data was read", target),
                });
            }

            let shortfall: Option<String> = match length {
                _ if number == 1 => Some("stream ended before any data was read".to_string()),
                Some(declared) if declared != offset => Some(format!(
                    "stream produced {} bytes but declared {}",
                    offset, declared
                )),
                _ => None,
            };

            match shortfall {
                Some(message) => {
                    log::warn!("Not committing {}: {}", upload_id, message);
                    state.failure = Some(PartFailure {
                        part_number: number,
                        error: StorageError::IoError {
                            path: target.to_string(),
                            message,
                        },
                    });
                }
                None => {
                    state.session.truncate_parts(number - 1);
                    state.session.set_total_length(offset);
                }
            }
        }
        self.finish(state, options).await
    }

    /// Abort an upload that will never be committed, logging any failure.
    async fn discard_session(&self, target: &ObjectTarget, upload_id: &str) {
        match self.client.abort_multipart_upload(target, upload_id).await {
            Ok(()) => log::info!("Aborted empty multipart upload {}", upload_id),
            Err(error) => log::warn!("Failed to abort multipart upload {}: {}", upload_id, error),
        }
    }

    /// Upload one part with retries and record the outcome.
    async fn send_part(
        &self,
        job: &PartJob<'_>,
        state: &Mutex<UploadState>,
        halted: &AtomicBool,
        plan: PartPlan,
        body: Bytes,
    ) {
        let md5: String = md5_base64(&body);
        lock(state).session.mark_in_flight(plan, &md5);

        let client: &C = self.client;
        let target: &ObjectTarget = job.target;
        let upload_id: &str = job.upload_id;
        let content_md5: Option<&str> = job
            .options
            .enable_checksum_verification
            .then_some(md5.as_str());
        let label: String = format!("part {} of {}", plan.number, upload_id);

        let retried = with_retry(&job.options.retry, &label, move || {
            client.upload_part(target, upload_id, plan.number, body.clone(), content_md5)
        })
        .await;

        let mut progress = PartProgress {
            upload_id: upload_id.to_string(),
            part_number: plan.number,
            total_parts: job.total_parts,
            offset: plan.offset,
            size: plan.length,
            md5,
            etag: None,
            error: None,
        };

        {
            let mut guard = lock(state);
            guard.stats.retries += u64::from(retried.retries);
            match retried.result {
                Ok(etag) => {
                    log::debug!("Uploaded part {} of {}", plan.number, upload_id);
                    guard.session.mark_done(plan.number, etag.clone());
                    guard.stats.record_uploaded(plan.length);
                    progress.etag = Some(etag);
                }
                Err(error) => {
                    log::warn!("Part {} of {} failed: {}", plan.number, upload_id, error);
                    progress.error = Some(error.to_string());
                    guard.session.mark_failed(plan.number);
                    halted.store(true, Ordering::Relaxed);
                    if guard.failure.is_none() {
                        guard.failure = Some(PartFailure {
                            part_number: plan.number,
                            error,
                        });
                    }
                }
            }
        }

        if let Some(callback) = self.progress {
            callback.on_part(&progress);
        }
    }

    /// Record a part that failed before it could be sent.
    fn record_failure(
        &self,
        job: &PartJob<'_>,
        state: &Mutex<UploadState>,
        halted: &AtomicBool,
        plan: PartPlan,
        error: StorageError,
    ) {
        log::warn!("Could not read part {} of {}: {}", plan.number, job.upload_id, error);
        halted.store(true, Ordering::Relaxed);

        let progress = PartProgress {
            upload_id: job.upload_id.to_string(),
            part_number: plan.number,
            total_parts: job.total_parts,
            offset: plan.offset,
            size: plan.length,
            md5: String::new(),
            etag: None,
            error: Some(error.to_string()),
        };

        {
            let mut guard = lock(state);
            guard.session.mark_failed(plan.number);
            if guard.failure.is_none() {
                guard.failure = Some(PartFailure {
                    part_number: plan.number,
                    error,
                });
            }
        }

        if let Some(callback) = self.progress {
            callback.on_part(&progress);
        }
    }

    /// Turn the final part state into a commit or a resumable error.
    async fn finish(
        &self,
        state: UploadState,
        options: &UploadOptions,
    ) -> Result<UploadResult, UploadError> {
        let UploadState {
            mut session,
            stats,
            failure,
        } = state;

        if let Some(failure) = failure {
            session.set_status(SessionStatus::ResumableFailed);
            let upload_id: String = session.upload_id().to_string();
            let session: Box<MultipartUploadSession> = Box::new(session);
            return Err(match failure.error {
                StorageError::ChecksumMismatch { .. } => UploadError::ChecksumMismatch {
                    part_number: failure.part_number,
                    upload_id,
                    session,
                },
                source => UploadError::PartUpload {
                    part_number: failure.part_number,
                    upload_id,
                    source,
                    session,
                },
            });
        }

        if self.is_cancelled() {
            log::info!(
                "Upload {} cancelled with {} parts stored",
                session.upload_id(),
                session.done_part_numbers().len()
            );
            return Err(UploadError::Cancelled {
                session: Some(Box::new(session)),
            });
        }

        self.commit(session, stats, options).await
    }

    /// Commit every acknowledged part in ascending order.
    async fn commit(
        &self,
        mut session: MultipartUploadSession,
        stats: TransferStatistics,
        options: &UploadOptions,
    ) -> Result<UploadResult, UploadError> {
        let upload_id: String = session.upload_id().to_string();
        let parts = session.committed_parts();

        let object: ObjectMetadata = self
            .client
            .complete_multipart_upload(session.target(), &upload_id, &parts)
            .await
            .map_err(|source| UploadError::Commit {
                upload_id: upload_id.clone(),
                source,
            })?;

        if options.enable_checksum_verification {
            verify_multipart_md5(&session, &object)?;
        }

        session.set_status(SessionStatus::Completed);
        log::info!(
            "Committed multipart upload {} for {} ({} parts)",
            upload_id,
            session.target(),
            parts.len()
        );

        Ok(UploadResult {
            upload_type: UploadType::Multipart,
            target: session.target().clone(),
            object,
            upload_id: Some(upload_id),
            parts,
            stats,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }
}

/// Destination and object attributes for one upload.
struct ObjectSpec {
    target: ObjectTarget,
    content_type: Option<String>,
    metadata: Option<HashMap<String, String>>,
}

/// Per-session values every part upload needs.
struct PartJob<'j> {
    target: &'j ObjectTarget,
    upload_id: &'j str,
    total_parts: Option<u32>,
    options: &'j UploadOptions,
}

/// Mutable state shared by in-flight parts.
struct UploadState {
    session: MultipartUploadSession,
    stats: TransferStatistics,
    /// First part failure; later failures are only logged.
    failure: Option<PartFailure>,
}

struct PartFailure {
    part_number: u32,
    error: StorageError,
}

/// Splits a stream into parts, starting with already-buffered bytes.
struct StreamChunker {
    reader: StreamReader,
    carry: Bytes,
    part_size: u64,
}

impl StreamChunker {
    fn new(reader: StreamReader, carry: Bytes, part_size: u64) -> Self {
        Self {
            reader,
            carry,
            part_size,
        }
    }

    /// Next part's bytes. Empty once the stream is exhausted.
    async fn next_part(&mut self) -> Result<Bytes, StorageError> {
        let part_size: usize = self.part_size as usize;
        if self.carry.len() >= part_size {
            return Ok(self.carry.split_to(part_size));
        }

        let needed: u64 = self.part_size - self.carry.len() as u64;
        let more: Bytes = read_chunk(&mut self.reader, needed).await?;
        if self.carry.is_empty() {
            return Ok(more);
        }

        let mut buffer: Vec<u8> = Vec::with_capacity(self.carry.len() + more.len());
        buffer.extend_from_slice(&self.carry);
        buffer.extend_from_slice(&more);
        self.carry = Bytes::new();
        Ok(Bytes::from(buffer))
    }
}

fn lock(state: &Mutex<UploadState>) -> MutexGuard<'_, UploadState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolve the length of a random-access source.
fn ranged_length(declared: Option<u64>, reported: Option<u64>) -> Result<u64, UploadError> {
    match (declared, reported) {
        (Some(declared), Some(actual)) if declared != actual => Err(UploadError::configuration(format!(
            "declared content length {} does not match source length {}",
            declared, actual
        ))),
        (_, Some(actual)) => Ok(actual),
        (Some(declared), None) => Ok(declared),
        (None, None) => Err(UploadError::Source {
            message: "source length is unknown".into(),
        }),
    }
}

async fn read_all(reader: &mut StreamReader) -> Result<Bytes, UploadError> {
    read_chunk(reader, u64::MAX)
        .await
        .map_err(|e| UploadError::Source {
            message: e.to_string(),
        })
}

/// Whether a stored part can stand in for `body`.
///
/// Sizes must match; digests are compared when the service reports one.
fn stored_matches(stored: &UploadedPart, body: &Bytes) -> bool {
    if stored.size != body.len() as u64 {
        return false;
    }
    match stored.md5.as_deref() {
        Some(md5) => md5 == md5_base64(body),
        None => true,
    }
}

/// Local multipart checksum, if every part's digest is known.
pub(crate) fn local_multipart_md5(session: &MultipartUploadSession) -> Option<String> {
    let digests: Option<Vec<[u8; MD5_LEN]>> = session
        .parts()
        .iter()
        .map(|p| p.md5.as_deref().and_then(decode_md5_base64))
        .collect();
    digests.map(|d| multipart_md5(&d))
}

fn verify_multipart_md5(
    session: &MultipartUploadSession,
    object: &ObjectMetadata,
) -> Result<(), UploadError> {
    let Some(reported) = object.multipart_md5.as_deref() else {
        return Ok(());
    };
    let Some(expected) = local_multipart_md5(session) else {
        log::warn!(
            "Cannot verify multipart checksum of {}: some part digests are unknown",
            session.upload_id()
        );
        return Ok(());
    };

    if reported != expected {
        return Err(UploadError::Commit {
            upload_id: session.upload_id().to_string(),
            source: StorageError::ChecksumMismatch {
                resource: session.target().to_string(),
                message: format!("service reported {}, expected {}", reported, expected),
            },
        });
    }
    Ok(())
}
