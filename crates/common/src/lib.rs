//! Shared types and utilities for objstore-transfer.
//!
//! This crate provides common functionality used across the workspace:
//! - Part sizing and limit constants
//! - MD5 checksum computation (base64 encoded, as object stores expect)
//! - Human-readable byte size formatting and parsing

pub mod constants;
pub mod error;
pub mod hash;
pub mod size;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::SizeParseError;
pub use hash::{
    decode_md5_base64, md5_base64, md5_digest, multipart_md5, Md5Hasher, MD5_LEN,
};
pub use size::{format_bytes, parse_size};
