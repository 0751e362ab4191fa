//! Shared constants used across objstore-transfer crates.

/// Mebibyte.
pub const MIB: u64 = 1024 * 1024;

/// Default part size for multipart uploads (128MiB).
/// Payloads at or below this size go up in a single request.
pub const DEFAULT_PART_SIZE: u64 = 128 * MIB;

/// Maximum number of parts a multipart upload may contain.
pub const MAX_PARTS: u64 = 10_000;

/// Default number of parts uploaded concurrently.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 5;

/// Default number of attempts per part (first try included).
pub const DEFAULT_PART_ATTEMPTS: u32 = 3;
