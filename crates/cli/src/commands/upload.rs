//! upload, upload-stream, resume and abort commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use objstore_transfer_common::format_bytes;
use objstore_transfer_storage::{
    MultipartUploadSession, PartStatus, UploadError, UploadManager, UploadOptions, UploadRequest,
    UploadResult, UploadSource, UploadType,
};
use tokio_util::sync::CancellationToken;

use super::object::object_key;
use super::{cancel_on_ctrl_c, CommandContext};
use crate::progress::PartProgressBar;

/// Options for `upload`.
#[derive(Debug)]
pub struct UploadFileOptions {
    pub key: Option<String>,
    pub content_type: Option<String>,
    pub session_file: Option<PathBuf>,
    pub upload: UploadOptions,
}

/// Options for `upload-stream`.
#[derive(Debug)]
pub struct UploadStreamOptions {
    pub key: String,
    pub length: Option<u64>,
    pub content_type: Option<String>,
    pub session_file: Option<PathBuf>,
    pub upload: UploadOptions,
}

/// Upload a file with the upload manager.
///
/// A resumable failure saves the session and is resumed once
/// automatically. Cancellation saves the session and stops.
pub async fn upload_file(ctx: &CommandContext, file: &Path, bucket: &str, options: UploadFileOptions) -> Result<()> {
    let key: String = object_key(file, options.key)?;
    let size: u64 = tokio::fs::metadata(file)
        .await
        .with_context(|| format!("Failed to read {:?}", file))?
        .len();
    let session_path: PathBuf = options
        .session_file
        .unwrap_or_else(|| default_session_path(&key));

    let bar = PartProgressBar::new(Some(size), &key, ctx.quiet);
    let cancel: CancellationToken = cancel_on_ctrl_c();
    let manager = UploadManager::new(&*ctx.client)
        .with_progress(&bar)
        .with_cancellation(cancel.clone());

    let mut request = UploadRequest::new(ctx.target(bucket, &key), UploadSource::file(file))
        .with_options(options.upload.clone());
    if let Some(content_type) = options.content_type {
        request = request.with_content_type(content_type);
    }

    tracing::info!("Uploading {:?} ({}) to {}/{}", file, format_bytes(size), bucket, key);

    let session: MultipartUploadSession = match manager.upload(request).await {
        Ok(result) => {
            bar.finish("done");
            report(ctx, &result);
            return Ok(());
        }
        Err(err) => match resumable_session(err, &session_path, &bar).await? {
            Some(session) if !cancel.is_cancelled() => session,
            _ => anyhow::bail!(
                "Upload interrupted; resume with: objstore resume --session-file {} {}",
                session_path.display(),
                file.display()
            ),
        },
    };

    tracing::warn!(
        "Retrying multipart upload {} from session {:?}",
        session.upload_id(),
        session_path
    );
    match manager
        .resume_upload(&session, UploadSource::file(file), options.upload)
        .await
    {
        Ok(result) => {
            bar.finish("done");
            remove_session(&session_path).await?;
            report(ctx, &result);
            Ok(())
        }
        Err(err) => {
            resumable_session(err, &session_path, &bar).await?;
            anyhow::bail!(
                "Upload failed after resume; retry with: objstore resume --session-file {} {}",
                session_path.display(),
                file.display()
            )
        }
    }
}

/// Upload from a single-pass stream (a file read front to back, or stdin).
pub async fn upload_stream(
    ctx: &CommandContext,
    input: &str,
    bucket: &str,
    options: UploadStreamOptions,
) -> Result<()> {
    let session_path: PathBuf = options
        .session_file
        .unwrap_or_else(|| default_session_path(&options.key));
    let source: UploadSource = open_stream(input, options.length).await?;

    let bar = PartProgressBar::new(options.length, &options.key, ctx.quiet);
    let manager = UploadManager::new(&*ctx.client)
        .with_progress(&bar)
        .with_cancellation(cancel_on_ctrl_c());

    let mut request = UploadRequest::new(ctx.target(bucket, &options.key), source)
        .with_options(options.upload);
    if let Some(length) = options.length {
        request = request.with_content_length(length);
    }
    if let Some(content_type) = options.content_type {
        request = request.with_content_type(content_type);
    }

    match manager.upload(request).await {
        Ok(result) => {
            bar.finish("done");
            report(ctx, &result);
            Ok(())
        }
        Err(err) => {
            resumable_session(err, &session_path, &bar).await?;
            anyhow::bail!(
                "Stream upload interrupted; resume with: objstore resume --session-file {} {}",
                session_path.display(),
                input
            )
        }
    }
}

/// Resume a saved session from the same content.
pub async fn resume(ctx: &CommandContext, session_path: &Path, input: &str, options: UploadOptions) -> Result<()> {
    let session: MultipartUploadSession = load_session(session_path).await?;
    let source: UploadSource = if input == "-" {
        UploadSource::stream(tokio::io::stdin())
    } else {
        UploadSource::file(input)
    };

    let label: String = session.target().object.clone();
    let bar = PartProgressBar::new(session.total_length(), &label, ctx.quiet);
    bar.skip(stored_bytes(&session));
    let manager = UploadManager::new(&*ctx.client)
        .with_progress(&bar)
        .with_cancellation(cancel_on_ctrl_c());

    ctx.info(&format!(
        "Resuming multipart upload {} to {}",
        session.upload_id(),
        session.target()
    ));

    match manager.resume_upload(&session, source, options).await {
        Ok(result) => {
            bar.finish("done");
            remove_session(session_path).await?;
            report(ctx, &result);
            Ok(())
        }
        Err(err) => {
            if resumable_session(err, session_path, &bar).await?.is_some() {
                anyhow::bail!("Resume incomplete; session saved to {}", session_path.display());
            }
            anyhow::bail!("Resume failed")
        }
    }
}

/// Abort a saved session and delete its session file.
pub async fn abort(ctx: &CommandContext, session_path: &Path) -> Result<()> {
    let mut session: MultipartUploadSession = load_session(session_path).await?;
    let manager = UploadManager::new(&*ctx.client);

    manager
        .abort_upload(&mut session)
        .await
        .with_context(|| format!("Failed to abort multipart upload {}", session.upload_id()))?;
    remove_session(session_path).await?;

    ctx.info(&format!("abort: {} ({})", session.target(), session.upload_id()));
    Ok(())
}

/// Save the session carried by a resumable error, or return the error.
///
/// Returns the session when one was saved, `None` on cancellation before
/// any session existed.
async fn resumable_session(
    err: UploadError,
    session_path: &Path,
    bar: &PartProgressBar,
) -> Result<Option<MultipartUploadSession>> {
    if !err.is_resumable() {
        bar.abandon("failed");
        return match err {
            UploadError::Cancelled { .. } => Ok(None),
            err => Err(anyhow::Error::new(err).context("Upload failed")),
        };
    }

    tracing::warn!("{}", err);
    bar.abandon("interrupted");
    let Some(session) = err.into_session() else {
        return Ok(None);
    };
    save_session(session_path, &session).await?;
    eprintln!(
        "Multipart upload {} saved to {}",
        session.upload_id(),
        session_path.display()
    );
    Ok(Some(session))
}

/// Write a session record as JSON.
pub async fn save_session(path: &Path, session: &MultipartUploadSession) -> Result<()> {
    let json: String = serde_json::to_string_pretty(session).context("Failed to serialize session")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write session file {:?}", path))
}

/// Read a session record written by `save_session`.
pub async fn load_session(path: &Path) -> Result<MultipartUploadSession> {
    let json: String = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read session file {:?}", path))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid session file {:?}", path))
}

async fn remove_session(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove session file {:?}", path)),
    }
}

/// Session file used when none is given: `<key>.session.json` in the
/// working directory, with path separators flattened.
fn default_session_path(key: &str) -> PathBuf {
    PathBuf::from(format!("{}.session.json", key.replace('/', "_")))
}

async fn open_stream(input: &str, length: Option<u64>) -> Result<UploadSource> {
    if input == "-" {
        let stdin = tokio::io::stdin();
        return Ok(match length {
            Some(length) => UploadSource::stream_with_length(stdin, length),
            None => UploadSource::stream(stdin),
        });
    }

    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open {}", input))?;
    Ok(match length {
        Some(length) => UploadSource::stream_with_length(file, length),
        None => UploadSource::stream(file),
    })
}

/// Bytes of parts the session already records as stored.
fn stored_bytes(session: &MultipartUploadSession) -> u64 {
    session
        .parts()
        .iter()
        .filter(|p| p.status == PartStatus::Done)
        .map(|p| p.length)
        .sum()
}

fn report(ctx: &CommandContext, result: &UploadResult) {
    let stats = &result.stats;
    match result.upload_type {
        UploadType::SinglePart => ctx.info(&format!(
            "upload: {} ({}, single request)",
            result.target,
            format_bytes(stats.bytes_uploaded)
        )),
        UploadType::Multipart => ctx.info(&format!(
            "upload: {} ({} in {} parts, {} skipped, {} retries, upload {})",
            result.target,
            format_bytes(stats.bytes_uploaded + stats.bytes_skipped),
            result.parts.len(),
            stats.parts_skipped,
            stats.retries,
            result.upload_id.as_deref().unwrap_or("-")
        )),
    }
}
