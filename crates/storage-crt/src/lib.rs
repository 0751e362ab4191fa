//! AWS SDK S3 backend for objstore-transfer storage.
//!
//! This crate provides an `ObjectStorageClient` implementation using the AWS
//! SDK for Rust. It covers bucket and object operations plus the multipart
//! calls the upload manager needs. Any S3-compatible endpoint works; set
//! `StorageSettings::endpoint` and usually `force_path_style`.
//!
//! # Example
//!
//! ```ignore
//! use objstore_transfer_storage_crt::CrtStorageClient;
//! use objstore_transfer_storage::{StorageSettings, UploadManager};
//!
//! let settings = StorageSettings::default();
//! let client = CrtStorageClient::new(settings).await?;
//! let manager = UploadManager::new(&client);
//! ```

mod client;
mod error;

pub use client::CrtStorageClient;
pub use error::CrtError;
