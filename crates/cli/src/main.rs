//! objstore - multipart uploads to S3-compatible object storage
//!
//! Usage:
//!   objstore namespace
//!   objstore mb my-bucket
//!   objstore upload ./large.bin my-bucket --part-size 64MiB --verify-checksum
//!   objstore upload-stream - my-bucket --key backup.tar
//!   objstore resume --session-file upload.json ./large.bin

mod commands;
mod config;
mod progress;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{CommandContext, UploadFlags};
use config::Config;

#[derive(Parser)]
#[command(name = "objstore")]
#[command(version)]
#[command(about = "Resumable multipart uploads to S3-compatible object storage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Profile to use from config file
    #[arg(short, long, global = true, env = "OBJSTORE_PROFILE")]
    profile: Option<String>,

    /// Configuration file path (default: ~/.objstore/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Endpoint URL for S3-compatible services
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// AWS region
    #[arg(long, global = true)]
    region: Option<String>,

    /// Namespace objects are addressed in
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// Use an in-memory store instead of S3
    #[arg(long, global = true)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "OBJSTORE_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Suppress progress and informational output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the namespace of the configured account
    Namespace,

    /// Make bucket
    Mb {
        /// Bucket name
        bucket: String,
    },

    /// Remove an empty bucket
    Rb {
        /// Bucket name
        bucket: String,
    },

    /// Upload a file in a single request
    Put {
        /// Local file
        file: PathBuf,

        /// Destination bucket
        bucket: String,

        /// Object key (defaults to the file name)
        #[arg(long)]
        key: Option<String>,

        /// Content type
        #[arg(long)]
        content_type: Option<String>,

        /// User metadata as key=value (repeatable)
        #[arg(long = "metadata", value_parser = commands::parse_key_value)]
        metadata: Vec<(String, String)>,
    },

    /// Remove an object
    Rm {
        /// Bucket name
        bucket: String,

        /// Object key
        key: String,
    },

    /// Upload a file, in parts when it is large
    Upload {
        /// Local file
        file: PathBuf,

        /// Destination bucket
        bucket: String,

        /// Object key (defaults to the file name)
        #[arg(long)]
        key: Option<String>,

        /// Content type
        #[arg(long)]
        content_type: Option<String>,

        /// Where to save the session if the upload fails
        #[arg(long)]
        session_file: Option<PathBuf>,

        #[command(flatten)]
        flags: UploadFlags,
    },

    /// Upload from a single-pass stream
    UploadStream {
        /// Input file read as a stream, or - for stdin
        input: String,

        /// Destination bucket
        bucket: String,

        /// Object key
        #[arg(long)]
        key: String,

        /// Declared length of the stream, if known
        #[arg(long, value_parser = objstore_transfer_common::parse_size)]
        length: Option<u64>,

        /// Content type
        #[arg(long)]
        content_type: Option<String>,

        /// Where to save the session if the upload fails
        #[arg(long)]
        session_file: Option<PathBuf>,

        #[command(flatten)]
        flags: UploadFlags,
    },

    /// Resume a multipart upload from a saved session
    Resume {
        /// Session file written by a failed upload
        #[arg(long)]
        session_file: PathBuf,

        /// The same content, as a file or - for stdin
        input: String,

        #[command(flatten)]
        flags: UploadFlags,
    },

    /// Abort a multipart upload from a saved session
    Abort {
        /// Session file written by a failed upload
        #[arg(long)]
        session_file: PathBuf,
    },

    /// Run the end-to-end example against a throwaway bucket
    Demo {
        /// Size of the generated file
        #[arg(long, default_value = "300MiB", value_parser = objstore_transfer_common::parse_size)]
        size: u64,

        #[command(flatten)]
        flags: UploadFlags,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();

    let mut config: Config = Config::load(cli.config.as_deref(), cli.profile.as_deref())?;

    // Command-line arguments take precedence
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = Some(endpoint);
    }
    if let Some(region) = cli.region {
        config.region = region;
    }
    if let Some(namespace) = cli.namespace {
        config.namespace = namespace;
    }

    let ctx: CommandContext = CommandContext::connect(&config, cli.dry_run, cli.quiet).await?;

    match cli.command {
        Commands::Namespace => commands::bucket::namespace(&ctx).await,
        Commands::Mb { bucket } => commands::bucket::make(&ctx, &bucket).await,
        Commands::Rb { bucket } => commands::bucket::remove(&ctx, &bucket).await,
        Commands::Put {
            file,
            bucket,
            key,
            content_type,
            metadata,
        } => {
            let options = commands::object::PutOptions {
                key,
                content_type,
                metadata: metadata.into_iter().collect(),
            };
            commands::object::put(&ctx, &file, &bucket, options).await
        }
        Commands::Rm { bucket, key } => commands::object::remove(&ctx, &bucket, &key).await,
        Commands::Upload {
            file,
            bucket,
            key,
            content_type,
            session_file,
            flags,
        } => {
            let options = commands::upload::UploadFileOptions {
                key,
                content_type,
                session_file,
                upload: flags.apply(&ctx.upload_options),
            };
            commands::upload::upload_file(&ctx, &file, &bucket, options).await
        }
        Commands::UploadStream {
            input,
            bucket,
            key,
            length,
            content_type,
            session_file,
            flags,
        } => {
            let options = commands::upload::UploadStreamOptions {
                key,
                length,
                content_type,
                session_file,
                upload: flags.apply(&ctx.upload_options),
            };
            commands::upload::upload_stream(&ctx, &input, &bucket, options).await
        }
        Commands::Resume {
            session_file,
            input,
            flags,
        } => commands::upload::resume(&ctx, &session_file, &input, flags.apply(&ctx.upload_options)).await,
        Commands::Abort { session_file } => commands::upload::abort(&ctx, &session_file).await,
        Commands::Demo { size, flags } => {
            commands::demo::run(&ctx, size, flags.apply(&ctx.upload_options)).await
        }
    }
}
