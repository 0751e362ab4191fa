//! Upload content sources.

use std::fmt;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};

use crate::error::StorageError;

/// Content to upload.
///
/// `File` and `Bytes` support independent range reads, so their parts can
/// be uploaded concurrently. `Stream` has a single read cursor and is
/// always uploaded sequentially.
pub enum UploadSource {
    /// A local file, re-opened for each range read.
    File(PathBuf),
    /// In-memory content.
    Bytes(Bytes),
    /// A single-pass reader with an optional declared length.
    Stream {
        reader: Box<dyn AsyncRead + Send + Unpin>,
        length: Option<u64>,
    },
}

impl UploadSource {
    /// Upload from a file path.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        UploadSource::File(path.into())
    }

    /// Upload from memory.
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        UploadSource::Bytes(data.into())
    }

    /// Upload from a reader of unknown length.
    pub fn stream<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        UploadSource::Stream {
            reader: Box::new(reader),
            length: None,
        }
    }

    /// Upload from a reader whose length is known up front.
    pub fn stream_with_length<R>(reader: R, length: u64) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        UploadSource::Stream {
            reader: Box::new(reader),
            length: Some(length),
        }
    }

    /// Whether disjoint byte ranges can be read independently.
    pub fn supports_random_access(&self) -> bool {
        !matches!(self, UploadSource::Stream { .. })
    }

    /// Length of the content, if it can be determined without reading it.
    pub async fn content_length(&self) -> Result<Option<u64>, StorageError> {
        match self {
            UploadSource::File(path) => {
                let metadata = tokio::fs::metadata(path)
                    .await
                    .map_err(|e| StorageError::io(path.display().to_string(), e))?;
                if !metadata.is_file() {
                    return Err(StorageError::IoError {
                        path: path.display().to_string(),
                        message: "Not a regular file".into(),
                    });
                }
                Ok(Some(metadata.len()))
            }
            UploadSource::Bytes(data) => Ok(Some(data.len() as u64)),
            UploadSource::Stream { length, .. } => Ok(*length),
        }
    }
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadSource::File(path) => f.debug_tuple("File").field(path).finish(),
            UploadSource::Bytes(data) => f.debug_tuple("Bytes").field(&data.len()).finish(),
            UploadSource::Stream { length, .. } => {
                f.debug_struct("Stream").field("length", length).finish()
            }
        }
    }
}

/// Random-access view of a file or in-memory source.
#[derive(Debug, Clone)]
pub(crate) enum RangeReader {
    File(PathBuf),
    Bytes(Bytes),
}

impl RangeReader {
    /// Read `length` bytes starting at `offset`.
    pub(crate) async fn read_range(&self, offset: u64, length: u64) -> Result<Bytes, StorageError> {
        match self {
            RangeReader::Bytes(data) => {
                let start = offset as usize;
                let end = start.saturating_add(length as usize);
                if end > data.len() {
                    return Err(StorageError::IoError {
                        path: "<memory>".into(),
                        message: format!(
                            "range {}..{} exceeds content length {}",
                            start,
                            end,
                            data.len()
                        ),
                    });
                }
                Ok(data.slice(start..end))
            }
            RangeReader::File(path) => read_file_range(path, offset, length).await,
        }
    }
}

async fn read_file_range(path: &Path, offset: u64, length: u64) -> Result<Bytes, StorageError> {
    let path_str = || path.display().to_string();

    let mut file = File::open(path)
        .await
        .map_err(|e| StorageError::io(path_str(), e))?;

    file.seek(SeekFrom::Start(offset))
        .await
        .map_err(|e| StorageError::io(path_str(), e))?;

    let mut buffer: Vec<u8> = vec![0u8; length as usize];
    file.read_exact(&mut buffer)
        .await
        .map_err(|e| StorageError::io(path_str(), e))?;

    Ok(Bytes::from(buffer))
}

/// Read up to `limit` bytes from a stream.
///
/// Returns fewer bytes only when the stream ends.
pub(crate) async fn read_chunk<R>(reader: &mut R, limit: u64) -> Result<Bytes, StorageError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buffer: Vec<u8> = Vec::with_capacity(limit.min(16 * 1024 * 1024) as usize);
    (&mut *reader)
        .take(limit)
        .read_to_end(&mut buffer)
        .await
        .map_err(|e| StorageError::io("<stream>", e))?;
    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_content_length() {
        assert_eq!(
            UploadSource::bytes(vec![0u8; 42]).content_length().await.unwrap(),
            Some(42)
        );
        assert_eq!(
            UploadSource::stream(&b"abc"[..]).content_length().await.unwrap(),
            None
        );
        assert_eq!(
            UploadSource::stream_with_length(&b"abc"[..], 3)
                .content_length()
                .await
                .unwrap(),
            Some(3)
        );
    }

    #[tokio::test]
    async fn test_content_length_missing_file() {
        let source = UploadSource::file("/nonexistent/upload.bin");
        assert!(matches!(
            source.content_length().await,
            Err(StorageError::IoError { .. })
        ));
    }

    #[test]
    fn test_random_access() {
        assert!(UploadSource::file("a").supports_random_access());
        assert!(UploadSource::bytes(Vec::<u8>::new()).supports_random_access());
        assert!(!UploadSource::stream(&b""[..]).supports_random_access());
    }

    #[tokio::test]
    async fn test_read_file_range() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        file.flush().unwrap();

        let reader = RangeReader::File(file.path().to_path_buf());
        assert_eq!(reader.read_range(3, 4).await.unwrap(), Bytes::from_static(b"3456"));
        assert!(reader.read_range(8, 4).await.is_err());
    }

    #[tokio::test]
    async fn test_read_bytes_range() {
        let reader = RangeReader::Bytes(Bytes::from_static(b"0123456789"));
        assert_eq!(reader.read_range(0, 3).await.unwrap(), Bytes::from_static(b"012"));
        assert!(reader.read_range(9, 2).await.is_err());
    }

    #[tokio::test]
    async fn test_read_chunk_until_end() {
        let mut reader: &[u8] = b"abcdefg";
        assert_eq!(read_chunk(&mut reader, 3).await.unwrap(), Bytes::from_static(b"abc"));
        assert_eq!(read_chunk(&mut reader, 3).await.unwrap(), Bytes::from_static(b"def"));
        assert_eq!(read_chunk(&mut reader, 3).await.unwrap(), Bytes::from_static(b"g"));
        assert!(read_chunk(&mut reader, 3).await.unwrap().is_empty());
    }
}
