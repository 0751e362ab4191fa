//! CLI command implementations

pub mod bucket;
pub mod demo;
pub mod object;
pub mod upload;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use objstore_transfer_common::parse_size;
use objstore_transfer_storage::{
    MemoryObjectStore, ObjectStorageClient, ObjectTarget, RetrySettings, UploadOptions,
};
use objstore_transfer_storage_crt::CrtStorageClient;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Context passed to all commands
pub struct CommandContext {
    pub client: Arc<dyn ObjectStorageClient>,
    pub namespace: String,
    pub upload_options: UploadOptions,
    pub quiet: bool,
}

impl CommandContext {
    /// Build the context, connecting to S3 or to an in-memory store.
    pub async fn connect(config: &Config, dry_run: bool, quiet: bool) -> Result<Self> {
        let client: Arc<dyn ObjectStorageClient> = if dry_run {
            tracing::info!("Dry run: using in-memory object store");
            Arc::new(MemoryObjectStore::new(config.namespace.clone()))
        } else {
            let client = CrtStorageClient::new(config.storage_settings())
                .await
                .context("Failed to create S3 client")?;
            Arc::new(client)
        };

        Ok(Self {
            client,
            namespace: config.namespace.clone(),
            upload_options: config.upload_options()?,
            quiet,
        })
    }

    /// Address an object in the configured namespace.
    pub fn target(&self, bucket: &str, key: &str) -> ObjectTarget {
        ObjectTarget::new(self.namespace.clone(), bucket, key)
    }

    /// Print info message if not quiet
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }
}

/// Upload flags shared by the upload commands.
#[derive(Debug, Clone, Default, Args)]
pub struct UploadFlags {
    /// Part size, e.g. 128MiB
    #[arg(long, value_parser = parse_size)]
    pub part_size: Option<u64>,

    /// Size above which uploads go multipart (defaults to the part size)
    #[arg(long, value_parser = parse_size)]
    pub multipart_threshold: Option<u64>,

    /// Always upload in a single request
    #[arg(long)]
    pub no_multipart: bool,

    /// Upload parts one at a time
    #[arg(long)]
    pub no_parallel: bool,

    /// Send part digests for server-side verification
    #[arg(long)]
    pub verify_checksum: bool,

    /// Maximum parts in flight
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Attempts per part, including the first
    #[arg(long)]
    pub max_attempts: Option<u32>,
}

impl UploadFlags {
    /// Apply the flags on top of configured options.
    pub fn apply(&self, base: &UploadOptions) -> UploadOptions {
        let mut options: UploadOptions = base.clone();
        if let Some(part_size) = self.part_size {
            options = options.with_part_size(part_size);
        }
        if let Some(threshold) = self.multipart_threshold {
            options = options.with_multipart_threshold(threshold);
        }
        if self.no_multipart {
            options = options.with_multipart(false);
        }
        if self.no_parallel {
            options = options.with_parallel(false);
        }
        if self.verify_checksum {
            options = options.with_checksum_verification(true);
        }
        if let Some(concurrency) = self.concurrency {
            options = options.with_max_concurrency(concurrency);
        }
        if let Some(max_attempts) = self.max_attempts {
            let retry = RetrySettings {
                max_attempts,
                ..options.retry.clone()
            };
            options = options.with_retry(retry);
        }
        options
    }
}

/// Cancellation token that fires on Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; finishing in-flight parts");
            trigger.cancel();
        }
    });
    token
}

/// Parse a `key=value` metadata argument.
pub fn parse_key_value(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", arg)),
    }
}
