//! Error types for storage and upload operations.

use thiserror::Error;

use crate::session::MultipartUploadSession;

/// Errors returned by an [`ObjectStorageClient`](crate::ObjectStorageClient).
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// Bucket, object or multipart upload not found.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Access denied.
    #[error("Access denied to {resource}: {message}")]
    AccessDenied { resource: String, message: String },

    /// The service rejected a declared content digest.
    #[error("Checksum mismatch for {resource}: {message}")]
    ChecksumMismatch { resource: String, message: String },

    /// Network or service-side failure.
    #[error("Network error: {message}")]
    NetworkError { message: String, retryable: bool },

    /// Local I/O error.
    #[error("I/O error for {path}: {message}")]
    IoError { path: String, message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl StorageError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            StorageError::NetworkError { retryable, .. } => *retryable,
            StorageError::NotFound { .. } => false,
            StorageError::AccessDenied { .. } => false,
            StorageError::ChecksumMismatch { .. } => false,
            StorageError::IoError { .. } => false,
            StorageError::InvalidConfig { .. } => false,
            StorageError::Other { .. } => false,
        }
    }

    /// Build an `IoError` for a path.
    pub fn io(path: impl Into<String>, err: std::io::Error) -> Self {
        StorageError::IoError {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError {
            path: String::new(),
            message: err.to_string(),
        }
    }
}

/// Errors returned by the [`UploadManager`](crate::UploadManager).
///
/// Variants that leave a multipart upload open on the service carry the
/// session record; pass it to `UploadManager::resume_upload` to continue
/// without re-sending acknowledged parts.
#[derive(Error, Debug)]
pub enum UploadError {
    /// Invalid part size, concurrency, retry settings or part count.
    #[error("Invalid upload configuration: {message}")]
    Configuration { message: String },

    /// The local source could not be read before any session existed.
    #[error("Failed to read upload source: {message}")]
    Source { message: String },

    /// The single-request upload failed.
    #[error("Upload of {target} failed: {source}")]
    SinglePartUpload { target: String, source: StorageError },

    /// The service did not hand out an upload ID. Nothing to resume.
    #[error("Failed to create multipart upload for {target}: {source}")]
    SessionCreation { target: String, source: StorageError },

    /// A part failed after exhausting its retry allowance.
    #[error("Part {part_number} of multipart upload {upload_id} failed: {source}")]
    PartUpload {
        part_number: u32,
        upload_id: String,
        source: StorageError,
        session: Box<MultipartUploadSession>,
    },

    /// The service rejected a part's declared digest.
    #[error("Checksum rejected for part {part_number} of multipart upload {upload_id}")]
    ChecksumMismatch {
        part_number: u32,
        upload_id: String,
        session: Box<MultipartUploadSession>,
    },

    /// The commit step was rejected or its checksum did not match.
    #[error("Failed to commit multipart upload {upload_id}: {source}")]
    Commit { upload_id: String, source: StorageError },

    /// Resume was requested for an upload ID the service does not know.
    #[error("Multipart upload {upload_id} not found")]
    ResumeNotFound { upload_id: String },

    /// Listing acknowledged parts failed for another reason.
    #[error("Failed to list parts of multipart upload {upload_id}: {source}")]
    Resume { upload_id: String, source: StorageError },

    /// The caller cancelled the upload. Any open session stays resumable.
    #[error("Upload cancelled")]
    Cancelled {
        session: Option<Box<MultipartUploadSession>>,
    },

    /// Explicit abort of a multipart upload failed.
    #[error("Failed to abort multipart upload {upload_id}: {source}")]
    Abort { upload_id: String, source: StorageError },
}

impl UploadError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        UploadError::Configuration {
            message: message.into(),
        }
    }

    /// The open session this failure left behind, if any.
    pub fn session(&self) -> Option<&MultipartUploadSession> {
        match self {
            UploadError::PartUpload { session, .. } => Some(session.as_ref()),
            UploadError::ChecksumMismatch { session, .. } => Some(session.as_ref()),
            UploadError::Cancelled { session } => session.as_deref(),
            _ => None,
        }
    }

    /// Take ownership of the open session this failure left behind.
    pub fn into_session(self) -> Option<MultipartUploadSession> {
        match self {
            UploadError::PartUpload { session, .. } => Some(*session),
            UploadError::ChecksumMismatch { session, .. } => Some(*session),
            UploadError::Cancelled { session } => session.map(|s| *s),
            _ => None,
        }
    }

    /// Whether the upload can be continued with `resume_upload`.
    pub fn is_resumable(&self) -> bool {
        self.session().is_some()
    }

    /// Upload ID of the multipart session involved, if one was created.
    pub fn upload_id(&self) -> Option<&str> {
        match self {
            UploadError::PartUpload { upload_id, .. }
            | UploadError::ChecksumMismatch { upload_id, .. }
            | UploadError::Commit { upload_id, .. }
            | UploadError::ResumeNotFound { upload_id }
            | UploadError::Resume { upload_id, .. }
            | UploadError::Abort { upload_id, .. } => Some(upload_id.as_str()),
            UploadError::Cancelled { session } => session.as_ref().map(|s| s.upload_id()),
            _ => None,
        }
    }
}
