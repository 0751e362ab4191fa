//! Integration tests for the upload manager against the in-memory store.
//!
//! Part sizes are scaled down to bytes so the scenarios stay fast:
//! - Single request versus multipart selection
//! - Part tiling and ascending commit order
//! - Sequential and parallel part failures, resume and abort
//! - Retries, checksum rejection and multipart checksum verification
//! - Stream sources and cancellation

use std::io::Write;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;

use bytes::Bytes;
use objstore_transfer_storage::{
    MemoryObjectStore, MultipartUploadSession, ObjectStorageClient, ObjectTarget, PartProgress,
    PartProgressCallback, RetrySettings, SessionStatus, StorageError, UploadError, UploadManager,
    UploadOptions, UploadRequest, UploadSource, UploadType,
};
use tokio::io::{AsyncReadExt, ReadBuf};
use tokio_util::sync::CancellationToken;

fn target() -> ObjectTarget {
    ObjectTarget::new("ns", "bucket", "data/object.bin")
}

/// Options with tiny parts and millisecond backoff.
fn options(part_size: u64) -> UploadOptions {
    UploadOptions::default()
        .with_part_size(part_size)
        .with_retry(RetrySettings {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            backoff_multiplier: 2.0,
        })
}

fn payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i * 7 % 256) as u8).collect()
}

fn bytes_request(size: usize, options: UploadOptions) -> UploadRequest {
    UploadRequest::new(target(), UploadSource::bytes(payload(size))).with_options(options)
}

/// Collects every progress report.
#[derive(Default)]
struct Recorder {
    reports: Mutex<Vec<PartProgress>>,
}

impl Recorder {
    fn reports(&self) -> Vec<PartProgress> {
        self.reports.lock().unwrap().clone()
    }
}

impl PartProgressCallback for Recorder {
    fn on_part(&self, progress: &PartProgress) {
        self.reports.lock().unwrap().push(progress.clone());
    }
}

// ============================================================================
// Strategy selection
// ============================================================================

#[tokio::test]
async fn test_file_below_threshold_uses_single_request() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&payload(100)).unwrap();
    file.flush().unwrap();

    let store = MemoryObjectStore::new("ns");
    let manager = UploadManager::new(&store);
    let request = UploadRequest::new(target(), UploadSource::file(file.path()))
        .with_content_type("application/octet-stream")
        .with_options(options(128));

    let result = manager.upload(request).await.unwrap();

    assert_eq!(result.upload_type, UploadType::SinglePart);
    assert_eq!(store.calls().single_puts, 1);
    assert_eq!(store.calls().sessions_created, 0);
    assert_eq!(store.object(&target()).unwrap(), Bytes::from(payload(100)));
    assert_eq!(
        store.object_content_type(&target()).as_deref(),
        Some("application/octet-stream")
    );
}

#[tokio::test]
async fn test_payload_equal_to_threshold_is_single_request() {
    let store = MemoryObjectStore::new("ns");
    let manager = UploadManager::new(&store);

    let result = manager.upload(bytes_request(128, options(128))).await.unwrap();

    assert_eq!(result.upload_type, UploadType::SinglePart);
    assert_eq!(store.calls().sessions_created, 0);
}

#[tokio::test]
async fn test_multipart_disabled_sends_single_request() {
    let store = MemoryObjectStore::new("ns");
    let manager = UploadManager::new(&store);

    let result = manager
        .upload(bytes_request(1000, options(100).with_multipart(false)))
        .await
        .unwrap();

    assert_eq!(result.upload_type, UploadType::SinglePart);
    assert_eq!(store.calls().sessions_created, 0);
    assert!(store.calls().part_attempts.is_empty());
}

#[tokio::test]
async fn test_too_many_parts_is_configuration_error() {
    let store = MemoryObjectStore::new("ns");
    let manager = UploadManager::new(&store);

    let err = manager.upload(bytes_request(10_001, options(1))).await.unwrap_err();

    assert!(matches!(err, UploadError::Configuration { .. }));
    assert_eq!(store.calls().sessions_created, 0);
}

// ============================================================================
// Multipart happy paths
// ============================================================================

#[tokio::test]
async fn test_three_part_upload_scaled() {
    // 300 MiB with 128 MiB parts, scaled to bytes.
    let store = MemoryObjectStore::new("ns");
    let recorder = Recorder::default();
    let manager = UploadManager::new(&store).with_progress(&recorder);

    let result = manager
        .upload(bytes_request(300, options(128).with_checksum_verification(true)))
        .await
        .unwrap();

    assert_eq!(result.upload_type, UploadType::Multipart);
    assert_eq!(store.calls().sessions_created, 1);
    assert_eq!(store.calls().commits, vec![vec![1, 2, 3]]);

    let mut sizes: Vec<(u32, u64)> = recorder
        .reports()
        .iter()
        .map(|r| (r.part_number, r.size))
        .collect();
    sizes.sort();
    assert_eq!(sizes, vec![(1, 128), (2, 128), (3, 44)]);
    assert!(recorder.reports().iter().all(|r| r.is_success() && r.total_parts == Some(3)));

    assert_eq!(store.object(&target()).unwrap(), Bytes::from(payload(300)));
    assert!(result.object.multipart_md5.unwrap().ends_with("-3"));
}

#[tokio::test]
async fn test_parts_tile_the_payload() {
    let store = MemoryObjectStore::new("ns");
    let recorder = Recorder::default();
    let manager = UploadManager::new(&store).with_progress(&recorder);

    let result = manager.upload(bytes_request(35, options(10))).await.unwrap();

    let mut reports = recorder.reports();
    reports.sort_by_key(|r| r.part_number);
    let ranges: Vec<(u64, u64)> = reports.iter().map(|r| (r.offset, r.size)).collect();
    assert_eq!(ranges, vec![(0, 10), (10, 10), (20, 10), (30, 5)]);
    assert_eq!(result.stats.bytes_uploaded, 35);
    assert_eq!(result.stats.parts_uploaded, 4);
}

#[tokio::test]
async fn test_parallel_parts_commit_in_ascending_order() {
    let store = MemoryObjectStore::new("ns");
    store.delay_part(1, Duration::from_millis(60));
    store.delay_part(2, Duration::from_millis(30));
    let manager = UploadManager::new(&store);

    let result = manager
        .upload(bytes_request(40, options(10).with_max_concurrency(4)))
        .await
        .unwrap();

    let completed = store.calls().parts_completed;
    assert_ne!(completed, vec![1, 2, 3, 4], "delays should reorder completion");

    let committed: Vec<u32> = result.parts.iter().map(|p| p.part_number).collect();
    assert_eq!(committed, vec![1, 2, 3, 4]);
    assert_eq!(store.calls().commits, vec![vec![1, 2, 3, 4]]);
    assert_eq!(store.object(&target()).unwrap(), Bytes::from(payload(40)));
}

#[tokio::test]
async fn test_sequential_parts_upload_in_order() {
    let store = MemoryObjectStore::new("ns");
    store.delay_part(1, Duration::from_millis(20));
    let manager = UploadManager::new(&store);

    manager
        .upload(bytes_request(40, options(10).with_parallel(false)))
        .await
        .unwrap();

    assert_eq!(store.calls().part_attempts, vec![1, 2, 3, 4]);
}

// ============================================================================
// Streams
// ============================================================================

#[tokio::test]
async fn test_stream_forces_sequential_upload() {
    let store = MemoryObjectStore::new("ns");
    let manager = UploadManager::new(&store);
    let data: &'static [u8] = Box::leak(payload(45).into_boxed_slice());

    let request = UploadRequest::new(target(), UploadSource::stream(data))
        .with_options(options(10).with_parallel(true).with_max_concurrency(8));
    let result = manager.upload(request).await.unwrap();

    assert_eq!(result.upload_type, UploadType::Multipart);
    assert_eq!(store.calls().part_attempts, vec![1, 2, 3, 4, 5]);
    assert_eq!(store.object(&target()).unwrap(), Bytes::from(payload(45)));
}

#[tokio::test]
async fn test_short_stream_uses_single_request() {
    let store = MemoryObjectStore::new("ns");
    let manager = UploadManager::new(&store);

    let request = UploadRequest::new(target(), UploadSource::stream(&b"tiny"[..]))
        .with_options(options(10));
    let result = manager.upload(request).await.unwrap();

    assert_eq!(result.upload_type, UploadType::SinglePart);
    assert_eq!(store.object(&target()).unwrap(), Bytes::from_static(b"tiny"));
}

#[tokio::test]
async fn test_stream_with_declared_length() {
    let store = MemoryObjectStore::new("ns");
    let recorder = Recorder::default();
    let manager = UploadManager::new(&store).with_progress(&recorder);
    let data: &'static [u8] = Box::leak(payload(25).into_boxed_slice());

    let request = UploadRequest::new(target(), UploadSource::stream_with_length(data, 25))
        .with_options(options(10));
    manager.upload(request).await.unwrap();

    assert!(recorder.reports().iter().all(|r| r.total_parts == Some(3)));
    assert_eq!(store.object(&target()).unwrap(), Bytes::from(payload(25)));
}

#[tokio::test]
async fn test_stream_shorter_than_declared_is_not_committed() {
    let store = MemoryObjectStore::new("ns");
    let manager = UploadManager::new(&store);
    let short: &'static [u8] = Box::leak(payload(25).into_boxed_slice());

    let request = UploadRequest::new(target(), UploadSource::stream_with_length(short, 50))
        .with_options(options(10));
    let err = manager.upload(request).await.unwrap_err();

    assert!(matches!(err, UploadError::PartUpload { part_number: 4, .. }));
    assert!(store.calls().commits.is_empty());
    assert!(store.object(&target()).is_none());
    assert_eq!(store.open_uploads(), 1);

    let session = err.into_session().unwrap();
    assert_eq!(session.status(), SessionStatus::ResumableFailed);
    assert_eq!(session.done_part_numbers(), vec![1, 2, 3]);

    // The full content completes the upload; the short third part is replaced.
    let full: &'static [u8] = Box::leak(payload(50).into_boxed_slice());
    let result = manager
        .resume_upload(&session, UploadSource::stream_with_length(full, 50), options(10))
        .await
        .unwrap();

    assert_eq!(result.stats.parts_skipped, 2);
    assert_eq!(store.calls().commits, vec![vec![1, 2, 3, 4, 5]]);
    assert_eq!(store.object(&target()).unwrap(), Bytes::from(payload(50)));
}

#[tokio::test]
async fn test_empty_stream_with_declared_length_leaves_no_open_upload() {
    let store = MemoryObjectStore::new("ns");
    let manager = UploadManager::new(&store);

    let request = UploadRequest::new(target(), UploadSource::stream_with_length(&b""[..], 50))
        .with_options(options(10));
    let err = manager.upload(request).await.unwrap_err();

    assert!(matches!(err, UploadError::Source { .. }));
    assert!(!err.is_resumable());
    assert_eq!(store.calls().sessions_created, 1);
    assert_eq!(store.calls().aborted.len(), 1);
    assert!(store.calls().commits.is_empty());
    assert_eq!(store.open_uploads(), 0);
}

/// Reader that fails on every read.
struct BrokenPipe;

impl tokio::io::AsyncRead for BrokenPipe {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut TaskContext<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Poll::Ready(Err(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe closed",
        )))
    }
}

#[tokio::test]
async fn test_unreadable_part_is_reported_to_progress() {
    let store = MemoryObjectStore::new("ns");
    let recorder = Recorder::default();
    let manager = UploadManager::new(&store).with_progress(&recorder);
    let data: &'static [u8] = Box::leak(payload(25).into_boxed_slice());

    let request = UploadRequest::new(target(), UploadSource::stream(data.chain(BrokenPipe)))
        .with_options(options(10));
    let err = manager.upload(request).await.unwrap_err();

    assert!(matches!(err, UploadError::PartUpload { part_number: 3, .. }));
    let reports = recorder.reports();
    assert_eq!(reports.len(), 3);
    assert!(reports[0].is_success() && reports[1].is_success());
    assert_eq!(reports[2].part_number, 3);
    assert_eq!(reports[2].offset, 20);
    assert!(reports[2].error.as_deref().unwrap().contains("pipe closed"));
    assert!(store.calls().commits.is_empty());
}

// ============================================================================
// Retries and checksums
// ============================================================================

#[tokio::test]
async fn test_transient_part_failures_are_retried() {
    let store = MemoryObjectStore::new("ns");
    store.fail_part(2, 2, true);
    let manager = UploadManager::new(&store);

    let result = manager
        .upload(bytes_request(30, options(10).with_parallel(false)))
        .await
        .unwrap();

    assert_eq!(result.stats.retries, 2);
    assert_eq!(store.calls().part_attempts, vec![1, 2, 2, 2, 3]);
}

#[tokio::test]
async fn test_retries_exhausted_fails_part() {
    let store = MemoryObjectStore::new("ns");
    store.fail_part(2, 10, true);
    let manager = UploadManager::new(&store);

    let err = manager
        .upload(bytes_request(30, options(10).with_parallel(false)))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::PartUpload { part_number: 2, .. }));
    let attempts: usize = store.calls().part_attempts.iter().filter(|n| **n == 2).count();
    assert_eq!(attempts, 3);
}

#[tokio::test]
async fn test_transient_single_put_failure_is_retried() {
    let store = MemoryObjectStore::new("ns");
    store.fail_single_put(1);
    let manager = UploadManager::new(&store);

    let result = manager.upload(bytes_request(5, options(10))).await.unwrap();

    assert_eq!(result.stats.retries, 1);
    assert_eq!(store.calls().single_puts, 2);
}

#[tokio::test]
async fn test_checksum_rejection_is_not_retried() {
    let store = MemoryObjectStore::new("ns");
    store.reject_part_checksum(2);
    let recorder = Recorder::default();
    let manager = UploadManager::new(&store).with_progress(&recorder);

    let err = manager
        .upload(bytes_request(
            30,
            options(10).with_parallel(false).with_checksum_verification(true),
        ))
        .await
        .unwrap_err();

    match &err {
        UploadError::ChecksumMismatch { part_number, .. } => assert_eq!(*part_number, 2),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_resumable());
    assert_eq!(store.calls().part_attempts, vec![1, 2]);

    let failed: Vec<PartProgress> = recorder.reports().into_iter().filter(|r| !r.is_success()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].part_number, 2);
}

#[tokio::test]
async fn test_wrong_multipart_checksum_fails_commit() {
    let store = MemoryObjectStore::new("ns");
    store.report_wrong_multipart_md5();
    let manager = UploadManager::new(&store);

    let err = manager
        .upload(bytes_request(30, options(10).with_checksum_verification(true)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        UploadError::Commit {
            source: StorageError::ChecksumMismatch { .. },
            ..
        }
    ));
    assert!(!err.is_resumable());
}

#[tokio::test]
async fn test_multipart_checksum_ignored_without_verification() {
    let store = MemoryObjectStore::new("ns");
    store.report_wrong_multipart_md5();
    let manager = UploadManager::new(&store);

    let result = manager.upload(bytes_request(30, options(10))).await;

    assert!(result.is_ok());
}

// ============================================================================
// Failures, resume and abort
// ============================================================================

#[tokio::test]
async fn test_failed_part_leaves_earlier_parts_and_resumes() {
    let store = MemoryObjectStore::new("ns");
    store.fail_part(3, 1, false);
    let manager = UploadManager::new(&store);
    let sequential = options(10).with_parallel(false);

    let err = manager
        .upload(bytes_request(50, sequential.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::PartUpload { part_number: 3, .. }));
    assert_eq!(store.calls().part_attempts, vec![1, 2, 3]);

    let session: MultipartUploadSession = err.into_session().unwrap();
    assert_eq!(session.status(), SessionStatus::ResumableFailed);
    assert_eq!(session.done_part_numbers(), vec![1, 2]);
    assert_eq!(store.pending_parts(session.upload_id()).unwrap(), vec![1, 2]);

    let result = manager
        .resume_upload(&session, UploadSource::bytes(payload(50)), sequential)
        .await
        .unwrap();

    assert_eq!(result.upload_id.as_deref(), Some(session.upload_id()));
    assert_eq!(result.stats.parts_skipped, 2);
    assert_eq!(result.stats.parts_uploaded, 3);
    assert_eq!(store.calls().part_attempts, vec![1, 2, 3, 3, 4, 5]);
    assert_eq!(store.calls().commits, vec![vec![1, 2, 3, 4, 5]]);
    assert_eq!(store.object(&target()).unwrap(), Bytes::from(payload(50)));
}

#[tokio::test]
async fn test_parallel_failure_stops_scheduling_and_finishes_in_flight() {
    let store = MemoryObjectStore::new("ns");
    store.delay_part(1, Duration::from_millis(50));
    store.fail_part(1, 1, false);
    store.delay_part(2, Duration::from_millis(100));
    let manager = UploadManager::new(&store);

    let err = manager
        .upload(bytes_request(60, options(10).with_max_concurrency(2)))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::PartUpload { part_number: 1, .. }));
    let mut attempts = store.calls().part_attempts;
    attempts.sort();
    assert_eq!(attempts, vec![1, 2]);

    let session = err.into_session().unwrap();
    assert!(session.is_done(2));
    assert!(!session.is_done(1));
}

#[tokio::test]
async fn test_resume_from_persisted_session() {
    let store = MemoryObjectStore::new("ns");
    store.fail_part(2, 1, false);
    let manager = UploadManager::new(&store);

    let err = manager
        .upload(bytes_request(30, options(10).with_parallel(false)))
        .await
        .unwrap_err();
    let json: String = serde_json::to_string(err.session().unwrap()).unwrap();

    let restored: MultipartUploadSession = serde_json::from_str(&json).unwrap();
    let result = manager
        .resume_upload(&restored, UploadSource::bytes(payload(30)), options(10))
        .await
        .unwrap();

    assert_eq!(result.stats.parts_skipped, 1);
    assert_eq!(store.object(&target()).unwrap(), Bytes::from(payload(30)));
}

#[tokio::test]
async fn test_resume_from_upload_id_only() {
    let store = MemoryObjectStore::new("ns");
    store.fail_part(3, 1, false);
    let manager = UploadManager::new(&store);

    let err = manager
        .upload(bytes_request(40, options(10).with_parallel(false)))
        .await
        .unwrap_err();
    let upload_id: String = err.upload_id().unwrap().to_string();

    let rebuilt = MultipartUploadSession::for_upload_id(target(), upload_id, 10);
    let result = manager
        .resume_upload(&rebuilt, UploadSource::bytes(payload(40)), options(10))
        .await
        .unwrap();

    assert_eq!(result.stats.parts_skipped, 2);
    assert_eq!(result.stats.parts_uploaded, 2);
}

#[tokio::test]
async fn test_resume_stream_discards_stored_parts() {
    let store = MemoryObjectStore::new("ns");
    store.fail_part(3, 1, false);
    let manager = UploadManager::new(&store);
    let data: &'static [u8] = Box::leak(payload(45).into_boxed_slice());

    let request = UploadRequest::new(target(), UploadSource::stream(data)).with_options(options(10));
    let session = manager.upload(request).await.unwrap_err().into_session().unwrap();
    assert_eq!(session.done_part_numbers(), vec![1, 2]);

    let result = manager
        .resume_upload(&session, UploadSource::stream(data), options(10))
        .await
        .unwrap();

    assert_eq!(result.stats.parts_skipped, 2);
    assert_eq!(result.stats.bytes_skipped, 20);
    assert_eq!(result.stats.parts_uploaded, 3);
    assert_eq!(store.object(&target()).unwrap(), Bytes::from(payload(45)));
}

#[tokio::test]
async fn test_resume_unknown_upload_id() {
    let store = MemoryObjectStore::new("ns");
    let manager = UploadManager::new(&store);
    let session = MultipartUploadSession::for_upload_id(target(), "no-such-upload", 10);

    let err = manager
        .resume_upload(&session, UploadSource::bytes(payload(30)), options(10))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::ResumeNotFound { ref upload_id } if upload_id == "no-such-upload"));
}

#[tokio::test]
async fn test_abort_after_failure() {
    let store = MemoryObjectStore::new("ns");
    store.fail_part(2, 1, false);
    let manager = UploadManager::new(&store);

    let err = manager
        .upload(bytes_request(30, options(10).with_parallel(false)))
        .await
        .unwrap_err();
    let mut session = err.into_session().unwrap();

    manager.abort_upload(&mut session).await.unwrap();

    assert_eq!(session.status(), SessionStatus::Aborted);
    assert_eq!(store.open_uploads(), 0);
    assert!(store.object(&target()).is_none());

    let err = manager
        .resume_upload(&session, UploadSource::bytes(payload(30)), options(10))
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Configuration { .. }));
}

#[tokio::test]
async fn test_session_creation_failure() {
    let store = MemoryObjectStore::new("ns");
    store.fail_session_creation();
    let manager = UploadManager::new(&store);

    let err = manager.upload(bytes_request(30, options(10))).await.unwrap_err();

    assert!(matches!(err, UploadError::SessionCreation { .. }));
    assert!(!err.is_resumable());
    assert!(store.calls().part_attempts.is_empty());
}

#[tokio::test]
async fn test_commit_failure_is_fatal() {
    let store = MemoryObjectStore::new("ns");
    store.fail_commit();
    let manager = UploadManager::new(&store);

    let err = manager.upload(bytes_request(30, options(10))).await.unwrap_err();

    assert!(matches!(err, UploadError::Commit { .. }));
    assert!(err.session().is_none());
}

#[tokio::test]
async fn test_missing_file_is_source_error() {
    let store = MemoryObjectStore::new("ns");
    let manager = UploadManager::new(&store);

    let request = UploadRequest::new(target(), UploadSource::file("/nonexistent/input.bin"));
    let err = manager.upload(request).await.unwrap_err();

    assert!(matches!(err, UploadError::Source { .. }));
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancelled_before_start() {
    let store = MemoryObjectStore::new("ns");
    let token = CancellationToken::new();
    token.cancel();
    let manager = UploadManager::new(&store).with_cancellation(token);

    let err = manager.upload(bytes_request(30, options(10))).await.unwrap_err();

    assert!(matches!(err, UploadError::Cancelled { session: None }));
    assert_eq!(store.calls().sessions_created, 0);
}

#[tokio::test]
async fn test_cancel_mid_upload_keeps_session_open() {
    let store = MemoryObjectStore::new("ns");
    let token = CancellationToken::new();
    let trigger = token.clone();
    let cancel_after_first = move |_: &PartProgress| trigger.cancel();
    let manager = UploadManager::new(&store)
        .with_progress(&cancel_after_first)
        .with_cancellation(token);

    let err = manager
        .upload(bytes_request(40, options(10).with_parallel(false)))
        .await
        .unwrap_err();

    let session = match err {
        UploadError::Cancelled { session: Some(session) } => *session,
        other => panic!("unexpected error: {other}"),
    };
    assert_eq!(session.status(), SessionStatus::Active);
    assert_eq!(session.done_part_numbers(), vec![1]);
    assert_eq!(store.open_uploads(), 1);
    assert!(store.calls().commits.is_empty());

    // A fresh manager without the cancelled token can finish the upload.
    let result = UploadManager::new(&store)
        .resume_upload(&session, UploadSource::bytes(payload(40)), options(10))
        .await
        .unwrap();
    assert_eq!(result.stats.parts_skipped, 1);
}

// ============================================================================
// Object operations
// ============================================================================

#[tokio::test]
async fn test_object_operations() {
    let store = MemoryObjectStore::new("tenancy").with_auto_create_buckets(false);
    let namespace: String = store.get_namespace().await.unwrap();
    assert_eq!(namespace, "tenancy");

    store.create_bucket(&namespace, "bucket", None).await.unwrap();
    let object = ObjectTarget::new(namespace.clone(), "bucket", "key");
    store
        .put_object(&object, Bytes::from_static(b"content"), None, None, None)
        .await
        .unwrap();
    store.delete_object(&object).await.unwrap();
    store.delete_bucket(&namespace, "bucket").await.unwrap();

    assert!(!store.bucket_exists("bucket"));
}
