//! Storage abstraction and upload coordination for object storage.
//!
//! This crate provides a backend-agnostic interface for storing objects in
//! bucket-based object stores and an upload manager that drives it:
//!
//! - **`ObjectStorageClient`** - The trait every backend implements
//! - **`UploadManager`** - Single-request or multipart uploads with
//!   parallel parts, retries, MD5 digests, resume and abort
//! - **`MemoryObjectStore`** - In-memory backend with fault injection
//!
//! The S3 backend lives in the `objstore-transfer-storage-crt` crate.
//!
//! # Sessions
//!
//! A multipart upload that fails part-way or is cancelled leaves its
//! `MultipartUploadSession` in the returned error. The session serializes,
//! so it can be written to disk and resumed from another process.

mod error;
pub mod memory;
mod parts;
mod retry;
mod session;
mod source;
mod traits;
mod types;
mod upload;

pub use error::{StorageError, UploadError};
pub use memory::{CallLog, MemoryObjectStore};
pub use parts::{
    check_part_count, expected_part_count, plan_parts, upload_strategy, PartPlan, UploadStrategy,
};
pub use session::{MultipartUploadSession, PartStatus, SessionStatus, UploadPart};
pub use source::UploadSource;
pub use traits::{
    CommittedPart, ObjectMetadata, ObjectStorageClient, PartProgressCallback, UploadedPart,
};
pub use types::{
    AwsCredentials, ObjectTarget, PartProgress, RetrySettings, StorageSettings,
    TransferStatistics, UploadOptions, UploadRequest, UploadResult, UploadType,
};
pub use upload::UploadManager;
