//! demo command - end-to-end run against a throwaway bucket

use std::collections::HashMap;
use std::io::Write;

use anyhow::{Context, Result};
use bytes::Bytes;
use objstore_transfer_common::{format_bytes, md5_base64, MIB};
use objstore_transfer_storage::{
    ObjectStorageClient, ObjectTarget, UploadError, UploadManager, UploadOptions, UploadRequest,
    UploadResult, UploadSource,
};
use rand::Rng;
use tempfile::NamedTempFile;

use super::CommandContext;
use crate::progress::PartProgressBar;

const PUT_KEY: &str = "demo-put.txt";
const UPLOAD_KEY: &str = "demo-upload.bin";
const STREAM_KEY: &str = "demo-stream.bin";

/// Create a random bucket, upload a generated file three ways, then
/// delete everything that was created.
pub async fn run(ctx: &CommandContext, size: u64, options: UploadOptions) -> Result<()> {
    let namespace: String = ctx
        .client
        .get_namespace()
        .await
        .context("Failed to get namespace")?;
    ctx.info(&format!("namespace: {}", namespace));

    let bucket: String = random_bucket_name();
    ctx.client
        .create_bucket(&ctx.namespace, &bucket, None)
        .await
        .with_context(|| format!("Failed to create bucket '{}'", bucket))?;
    ctx.info(&format!("make_bucket: {}", bucket));

    let file: NamedTempFile = tokio::task::spawn_blocking(move || write_random_file(size))
        .await
        .context("Failed to generate demo file")??;
    ctx.info(&format!("generated {} at {}", format_bytes(size), file.path().display()));

    let outcome: Result<()> = exercise(ctx, &bucket, &file, size, options).await;
    let cleanup: Result<()> = cleanup(ctx, &bucket).await;

    outcome?;
    cleanup
}

async fn exercise(
    ctx: &CommandContext,
    bucket: &str,
    file: &NamedTempFile,
    size: u64,
    options: UploadOptions,
) -> Result<()> {
    let body = Bytes::from_static(b"Hello from the objstore demo\n");
    let metadata: HashMap<String, String> = HashMap::from([("source".to_string(), "objstore-demo".to_string())]);
    let content_md5: String = md5_base64(&body);
    ctx.client
        .put_object(
            &ctx.target(bucket, PUT_KEY),
            body,
            Some(&content_md5),
            Some("text/plain"),
            Some(&metadata),
        )
        .await
        .context("Failed to put demo object")?;
    ctx.info(&format!("put: {}/{}", bucket, PUT_KEY));

    let bar = PartProgressBar::new(Some(size), UPLOAD_KEY, ctx.quiet);
    let manager = UploadManager::new(&*ctx.client).with_progress(&bar);
    let request = UploadRequest::new(ctx.target(bucket, UPLOAD_KEY), UploadSource::file(file.path()))
        .with_options(options.clone());
    let result: UploadResult = finish(&manager, &bar, manager.upload(request).await).await?;
    ctx.info(&format!(
        "upload: {} ({:?}, {} parts, {} retries)",
        result.target,
        result.upload_type,
        result.parts.len(),
        result.stats.retries
    ));

    let reader = tokio::fs::File::open(file.path())
        .await
        .context("Failed to reopen demo file")?;
    let bar = PartProgressBar::new(Some(size), STREAM_KEY, ctx.quiet);
    let manager = UploadManager::new(&*ctx.client).with_progress(&bar);
    let request = UploadRequest::new(ctx.target(bucket, STREAM_KEY), UploadSource::stream(reader))
        .with_options(options);
    let result: UploadResult = finish(&manager, &bar, manager.upload(request).await).await?;
    ctx.info(&format!(
        "upload-stream: {} ({:?}, {} parts)",
        result.target,
        result.upload_type,
        result.parts.len()
    ));

    Ok(())
}

/// Close the progress bar and abort any session a failed upload left open.
async fn finish(
    manager: &UploadManager<'_, dyn ObjectStorageClient>,
    bar: &PartProgressBar,
    outcome: Result<UploadResult, UploadError>,
) -> Result<UploadResult> {
    match outcome {
        Ok(result) => {
            bar.finish("done");
            Ok(result)
        }
        Err(err) => {
            bar.abandon("failed");
            let message: String = err.to_string();
            if let Some(mut session) = err.into_session() {
                if let Err(abort_err) = manager.abort_upload(&mut session).await {
                    tracing::warn!("Failed to abort {}: {}", session.upload_id(), abort_err);
                }
            }
            anyhow::bail!("Demo upload failed: {}", message)
        }
    }
}

async fn cleanup(ctx: &CommandContext, bucket: &str) -> Result<()> {
    for key in [PUT_KEY, UPLOAD_KEY, STREAM_KEY] {
        let target: ObjectTarget = ctx.target(bucket, key);
        match ctx.client.delete_object(&target).await {
            Ok(()) => ctx.info(&format!("delete: {}", target)),
            Err(e) => tracing::debug!("Skipping {}: {}", target, e),
        }
    }

    ctx.client
        .delete_bucket(&ctx.namespace, bucket)
        .await
        .with_context(|| format!("Failed to delete bucket '{}'", bucket))?;
    ctx.info(&format!("remove_bucket: {}", bucket));
    Ok(())
}

/// `objstore-demo-` followed by eight random lowercase letters.
fn random_bucket_name() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..8)
        .map(|_| char::from(b'a' + rng.random_range(0..26u8)))
        .collect();
    format!("objstore-demo-{}", suffix)
}

fn write_random_file(size: u64) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new().context("Failed to create temp file")?;
    let mut rng = rand::rng();
    let mut chunk: Vec<u8> = vec![0u8; MIB as usize];
    let mut remaining: u64 = size;

    while remaining > 0 {
        let len: usize = remaining.min(chunk.len() as u64) as usize;
        rng.fill(&mut chunk[..len]);
        file.write_all(&chunk[..len])
            .context("Failed to write temp file")?;
        remaining -= len as u64;
    }
    file.flush().context("Failed to write temp file")?;
    Ok(file)
}
