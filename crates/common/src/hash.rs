//! Checksum computation utilities.
//!
//! Object stores declare content digests as base64-encoded MD5 (the
//! `Content-MD5` / `opc-content-md5` header format), so everything here
//! produces and consumes that encoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use md5::{Digest, Md5};

/// Length of a raw MD5 digest in bytes.
pub const MD5_LEN: usize = 16;

/// Compute the raw MD5 digest of a byte slice.
pub fn md5_digest(data: &[u8]) -> [u8; MD5_LEN] {
    let mut hasher: Md5Hasher = Md5Hasher::new();
    hasher.update(data);
    hasher.finish()
}

/// Compute the MD5 of a byte slice as a base64 string.
///
/// # Arguments
/// * `data` - Bytes to hash
///
/// # Returns
/// 24-character base64 string (128 bits, padded).
pub fn md5_base64(data: &[u8]) -> String {
    STANDARD.encode(md5_digest(data))
}

/// Decode a base64 MD5 string back into its raw digest.
///
/// Returns `None` if the input is not valid base64 or is not 16 bytes long.
pub fn decode_md5_base64(encoded: &str) -> Option<[u8; MD5_LEN]> {
    let raw: Vec<u8> = STANDARD.decode(encoded.trim()).ok()?;
    if raw.len() != MD5_LEN {
        return None;
    }
    let mut digest = [0u8; MD5_LEN];
    digest.copy_from_slice(&raw);
    Some(digest)
}

/// Compute the checksum a service reports for a committed multipart object.
///
/// The value is the MD5 of the concatenated raw part digests, base64
/// encoded, followed by `-` and the part count. Part digests must be
/// given in ascending part-number order.
pub fn multipart_md5(part_digests: &[[u8; MD5_LEN]]) -> String {
    let mut hasher: Md5Hasher = Md5Hasher::new();
    for digest in part_digests {
        hasher.update(digest);
    }
    format!("{}-{}", hasher.finish_base64(), part_digests.len())
}

/// Streaming hasher for incremental MD5 hashing.
pub struct Md5Hasher {
    inner: Md5,
}

impl Md5Hasher {
    /// Create a new streaming hasher.
    pub fn new() -> Self {
        Self { inner: Md5::new() }
    }

    /// Update the hasher with additional data.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalize and return the raw digest.
    pub fn finish(self) -> [u8; MD5_LEN] {
        let mut digest = [0u8; MD5_LEN];
        digest.copy_from_slice(&self.inner.finalize());
        digest
    }

    /// Finalize and return the digest as a base64 string.
    pub fn finish_base64(self) -> String {
        STANDARD.encode(self.finish())
    }
}

impl Default for Md5Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_base64_known_values() {
        assert_eq!(md5_base64(b""), "1B2M2Y8AsgTpgAmY7PhCfg==");
        assert_eq!(md5_base64(b"hello world"), "XrY7u+Ae7tCTyyK7j1rNww==");
    }

    #[test]
    fn test_md5_different_inputs() {
        assert_ne!(md5_base64(b"hello"), md5_base64(b"world"));
    }

    #[test]
    fn test_hasher_incremental() {
        let mut hasher: Md5Hasher = Md5Hasher::new();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hasher.finish_base64(), md5_base64(b"hello world"));
    }

    #[test]
    fn test_decode_md5_base64() {
        let encoded: String = md5_base64(b"abc");
        assert_eq!(decode_md5_base64(&encoded), Some(md5_digest(b"abc")));
        assert_eq!(decode_md5_base64("not base64!"), None);
        // Valid base64, wrong length
        assert_eq!(decode_md5_base64("YWJj"), None);
    }

    #[test]
    fn test_multipart_md5_composition() {
        let part1: [u8; MD5_LEN] = md5_digest(b"part-one");
        let part2: [u8; MD5_LEN] = md5_digest(b"part-two");

        let mut concatenated: Vec<u8> = Vec::new();
        concatenated.extend_from_slice(&part1);
        concatenated.extend_from_slice(&part2);
        let expected: String = format!("{}-2", md5_base64(&concatenated));

        assert_eq!(multipart_md5(&[part1, part2]), expected);
    }

    #[test]
    fn test_multipart_md5_order_matters() {
        let a: [u8; MD5_LEN] = md5_digest(b"a");
        let b: [u8; MD5_LEN] = md5_digest(b"b");
        assert_ne!(multipart_md5(&[a, b]), multipart_md5(&[b, a]));
    }
}
