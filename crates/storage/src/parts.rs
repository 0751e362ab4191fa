//! Part planning for multipart uploads.
//!
//! Pure logic for the single-versus-multipart decision and for splitting a
//! payload into parts. No I/O.

use objstore_transfer_common::MAX_PARTS;

use crate::error::UploadError;
use crate::types::UploadOptions;

/// Byte range of one part within the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartPlan {
    /// 1-based part number.
    pub number: u32,
    /// Byte offset within the source.
    pub offset: u64,
    /// Length of this part in bytes.
    pub length: u64,
}

/// How a payload of known length will be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    /// One whole-object request, no session.
    SingleRequest,
    /// A multipart session.
    Multipart,
}

/// Determine upload strategy for a payload of known length.
pub fn upload_strategy(size: u64, options: &UploadOptions) -> UploadStrategy {
    if options.allow_multipart_uploads && size > options.threshold() {
        UploadStrategy::Multipart
    } else {
        UploadStrategy::SingleRequest
    }
}

/// Number of parts a payload splits into.
pub fn expected_part_count(size: u64, part_size: u64) -> u64 {
    if part_size == 0 || size == 0 {
        return 1;
    }
    size.div_ceil(part_size)
}

/// Split `size` bytes into parts of `part_size` bytes.
///
/// The last part may be shorter. An empty payload yields one empty part.
pub fn plan_parts(size: u64, part_size: u64) -> Vec<PartPlan> {
    if part_size == 0 || size == 0 {
        return vec![PartPlan {
            number: 1,
            offset: 0,
            length: size,
        }];
    }

    let mut parts = Vec::with_capacity(expected_part_count(size, part_size) as usize);
    let mut offset = 0u64;
    let mut number = 1u32;

    while offset < size {
        let length = std::cmp::min(part_size, size - offset);
        parts.push(PartPlan {
            number,
            offset,
            length,
        });
        offset += length;
        number += 1;
    }

    parts
}

/// Reject payloads that would need more parts than the service allows.
pub fn check_part_count(size: u64, part_size: u64) -> Result<(), UploadError> {
    let count: u64 = expected_part_count(size, part_size);
    if count > MAX_PARTS {
        return Err(UploadError::configuration(format!(
            "{} bytes with part size {} needs {} parts, more than the limit of {}",
            size, part_size, count, MAX_PARTS
        )));
    }
    Ok(())
}
