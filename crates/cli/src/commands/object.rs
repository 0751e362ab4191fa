//! put and rm commands

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;
use objstore_transfer_common::{format_bytes, md5_base64};
use objstore_transfer_storage::ObjectMetadata;

use super::CommandContext;

/// Options for `put`.
#[derive(Debug, Default)]
pub struct PutOptions {
    pub key: Option<String>,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Upload a file in a single request, sending its MD5 for verification.
pub async fn put(ctx: &CommandContext, file: &Path, bucket: &str, options: PutOptions) -> Result<()> {
    let key: String = object_key(file, options.key)?;
    let body: Bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {:?}", file))?
        .into();
    let content_md5: String = md5_base64(&body);
    let size: u64 = body.len() as u64;

    tracing::debug!("Putting {:?} ({} bytes) to {}/{}", file, size, bucket, key);

    let metadata: Option<&HashMap<String, String>> =
        (!options.metadata.is_empty()).then_some(&options.metadata);
    let stored: ObjectMetadata = ctx
        .client
        .put_object(
            &ctx.target(bucket, &key),
            body,
            Some(&content_md5),
            options.content_type.as_deref(),
            metadata,
        )
        .await
        .with_context(|| format!("Failed to upload {:?} to {}/{}", file, bucket, key))?;

    ctx.info(&format!(
        "put: {} -> {}/{} ({}, etag {})",
        file.display(),
        bucket,
        key,
        format_bytes(size),
        stored.etag.as_deref().unwrap_or("-")
    ));
    Ok(())
}

/// Delete an object.
pub async fn remove(ctx: &CommandContext, bucket: &str, key: &str) -> Result<()> {
    ctx.client
        .delete_object(&ctx.target(bucket, key))
        .await
        .with_context(|| format!("Failed to delete {}/{}", bucket, key))?;

    ctx.info(&format!("delete: {}/{}", bucket, key));
    Ok(())
}

/// Use the explicit key, or fall back to the file name.
pub fn object_key(file: &Path, key: Option<String>) -> Result<String> {
    match key {
        Some(key) if !key.is_empty() => Ok(key),
        Some(_) => anyhow::bail!("Object key cannot be empty"),
        None => file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("Cannot derive an object key from {:?}; use --key", file)),
    }
}
