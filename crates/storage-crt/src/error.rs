//! Error types for S3 storage operations.

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use objstore_transfer_storage::StorageError;
use thiserror::Error;

/// Errors specific to the S3 storage client.
#[derive(Error, Debug)]
pub enum CrtError {
    /// The service answered with an error.
    #[error("S3 {operation} failed ({code}): {message}")]
    Service {
        operation: &'static str,
        code: String,
        status: Option<u16>,
        message: String,
    },

    /// The request never got a usable response.
    #[error("S3 {operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// A response lacked a field the protocol guarantees.
    #[error("S3 {operation} response is missing {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CrtError {
    /// Wrap an SDK error for `operation`.
    pub(crate) fn from_sdk<E>(operation: &'static str, err: SdkError<E, HttpResponse>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    {
        let message: String = DisplayErrorContext(&err).to_string();
        match &err {
            SdkError::ServiceError(context) => CrtError::Service {
                operation,
                code: context.err().code().unwrap_or("Unknown").to_string(),
                status: Some(context.raw().status().as_u16()),
                message: context.err().message().map(str::to_string).unwrap_or(message),
            },
            SdkError::ConstructionFailure(_) => CrtError::ConfigError(message),
            _ => CrtError::Transport { operation, message },
        }
    }
}

impl From<CrtError> for StorageError {
    fn from(err: CrtError) -> Self {
        let text: String = err.to_string();
        match err {
            CrtError::Service {
                operation,
                code,
                status,
                ..
            } => classify_service_error(operation, &code, status, text),
            CrtError::Transport { .. } => StorageError::NetworkError {
                message: text,
                retryable: true,
            },
            CrtError::MissingField { .. } => StorageError::Other { message: text },
            CrtError::ConfigError(message) => StorageError::InvalidConfig { message },
        }
    }
}

/// Map an S3 error code and HTTP status onto a `StorageError`.
fn classify_service_error(
    operation: &str,
    code: &str,
    status: Option<u16>,
    message: String,
) -> StorageError {
    match code {
        "NoSuchUpload" | "NoSuchKey" | "NoSuchBucket" | "NotFound" => {
            return StorageError::NotFound { resource: message }
        }
        "BadDigest" | "InvalidDigest" => {
            return StorageError::ChecksumMismatch {
                resource: operation.to_string(),
                message,
            }
        }
        "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" => {
            return StorageError::AccessDenied {
                resource: operation.to_string(),
                message,
            }
        }
        "SlowDown" | "Throttling" | "ThrottlingException" | "RequestTimeout" | "InternalError"
        | "ServiceUnavailable" => {
            return StorageError::NetworkError {
                message,
                retryable: true,
            }
        }
        _ => {}
    }

    match status {
        Some(404) => StorageError::NotFound { resource: message },
        Some(403) => StorageError::AccessDenied {
            resource: operation.to_string(),
            message,
        },
        Some(408) | Some(429) => StorageError::NetworkError {
            message,
            retryable: true,
        },
        Some(s) if s >= 500 => StorageError::NetworkError {
            message,
            retryable: true,
        },
        _ => StorageError::NetworkError {
            message,
            retryable: false,
        },
    }
}
