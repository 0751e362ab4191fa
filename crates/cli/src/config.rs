//! Configuration management for the objstore CLI
//!
//! Config file location: ~/.objstore/config.toml
//!
//! Example config:
//! ```toml
//! [default]
//! region = "us-east-1"
//! namespace = "tenancy"
//!
//! [default.upload]
//! part_size = "128MiB"
//! concurrency = 5
//! verify_checksum = true
//!
//! [local]
//! endpoint = "http://localhost:9000"
//! access_key = "minioadmin"
//! secret_key = "minioadmin"
//! path_style = true
//! ```
//!
//! Environment variables override the file; command-line flags override both.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use objstore_transfer_common::{parse_size, SizeParseError};
use objstore_transfer_storage::{AwsCredentials, RetrySettings, StorageSettings, UploadOptions};
use serde::{Deserialize, Serialize};

/// A byte size written either as a plain integer or with a unit suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SizeValue {
    Bytes(u64),
    Text(String),
}

impl SizeValue {
    /// Size in bytes.
    pub fn bytes(&self) -> Result<u64, SizeParseError> {
        match self {
            SizeValue::Bytes(n) => Ok(*n),
            SizeValue::Text(s) => parse_size(s),
        }
    }
}

/// Upload defaults for a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Part size for multipart uploads
    pub part_size: Option<SizeValue>,

    /// Size above which uploads go multipart
    pub multipart_threshold: Option<SizeValue>,

    /// Allow multipart uploads
    #[serde(default = "default_true")]
    pub multipart: bool,

    /// Allow parallel part uploads
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Send part digests for server-side verification
    #[serde(default)]
    pub verify_checksum: bool,

    /// Maximum parts in flight
    pub concurrency: Option<usize>,

    /// Attempts per part, including the first
    pub max_attempts: Option<u32>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            part_size: None,
            multipart_threshold: None,
            multipart: true,
            parallel: true,
            verify_checksum: false,
            concurrency: None,
            max_attempts: None,
        }
    }
}

/// One configuration profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Custom endpoint URL for S3-compatible services
    pub endpoint: Option<String>,

    /// Access key ID
    pub access_key: Option<String>,

    /// Secret access key
    pub secret_key: Option<String>,

    /// Session token for temporary credentials
    pub session_token: Option<String>,

    /// Service region
    #[serde(default = "default_region")]
    pub region: String,

    /// Namespace objects are addressed in
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Path style access (use path instead of virtual hosted style)
    #[serde(default)]
    pub path_style: bool,

    /// Expected bucket owner account
    pub expected_bucket_owner: Option<String>,

    /// Upload defaults
    #[serde(default)]
    pub upload: UploadConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_key: None,
            secret_key: None,
            session_token: None,
            region: default_region(),
            namespace: default_namespace(),
            path_style: false,
            expected_bucket_owner: None,
            upload: UploadConfig::default(),
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

/// Configuration file with multiple profiles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(flatten)]
    pub profiles: HashMap<String, Config>,
}

impl Config {
    /// Get config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let home = directories::BaseDirs::new()
            .context("Could not determine home directory")?
            .home_dir()
            .to_path_buf();

        Ok(home.join(".objstore"))
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load a profile from the config file, then apply environment overrides.
    pub fn load(config_path: Option<&Path>, profile: Option<&str>) -> Result<Self> {
        let path: PathBuf = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        let mut config: Config = Self::load_file(&path, profile.unwrap_or("default"))?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load one profile from a file. A missing file yields the defaults.
    pub fn load_file(path: &Path, profile: &str) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config_file: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        match config_file.profiles.get(profile) {
            Some(config) => Ok(config.clone()),
            None if profile == "default" => Ok(Config::default()),
            None => anyhow::bail!("Profile '{}' not found in {:?}", profile, path),
        }
    }

    /// Override values from environment variables.
    ///
    /// `AWS_*` variables take precedence over `OBJSTORE_*` ones.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("OBJSTORE_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
        if let Some(endpoint) = lookup("AWS_ENDPOINT_URL") {
            self.endpoint = Some(endpoint);
        }
        if let Some(access_key) = lookup("OBJSTORE_ACCESS_KEY") {
            self.access_key = Some(access_key);
        }
        if let Some(access_key) = lookup("AWS_ACCESS_KEY_ID") {
            self.access_key = Some(access_key);
        }
        if let Some(secret_key) = lookup("OBJSTORE_SECRET_KEY") {
            self.secret_key = Some(secret_key);
        }
        if let Some(secret_key) = lookup("AWS_SECRET_ACCESS_KEY") {
            self.secret_key = Some(secret_key);
        }
        if let Some(token) = lookup("AWS_SESSION_TOKEN") {
            self.session_token = Some(token);
        }
        if let Some(region) = lookup("OBJSTORE_REGION") {
            self.region = region;
        }
        if let Some(region) = lookup("AWS_REGION") {
            self.region = region;
        }
        if let Some(namespace) = lookup("OBJSTORE_NAMESPACE") {
            self.namespace = namespace;
        }
    }

    /// Settings for the S3 backend.
    pub fn storage_settings(&self) -> StorageSettings {
        let credentials: Option<AwsCredentials> = match (&self.access_key, &self.secret_key) {
            (Some(access_key), Some(secret_key)) => Some(AwsCredentials {
                access_key_id: access_key.clone(),
                secret_access_key: secret_key.clone(),
                session_token: self.session_token.clone(),
            }),
            _ => None,
        };

        StorageSettings {
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            namespace: self.namespace.clone(),
            credentials,
            force_path_style: self.path_style,
            expected_bucket_owner: self.expected_bucket_owner.clone(),
        }
    }

    /// Upload options from the profile's upload section.
    pub fn upload_options(&self) -> Result<UploadOptions> {
        let upload: &UploadConfig = &self.upload;
        let mut options = UploadOptions::default()
            .with_multipart(upload.multipart)
            .with_parallel(upload.parallel)
            .with_checksum_verification(upload.verify_checksum);

        if let Some(ref size) = upload.part_size {
            options = options.with_part_size(size.bytes().context("Invalid upload.part_size")?);
        }
        if let Some(ref size) = upload.multipart_threshold {
            options = options.with_multipart_threshold(
                size.bytes().context("Invalid upload.multipart_threshold")?,
            );
        }
        if let Some(concurrency) = upload.concurrency {
            options = options.with_max_concurrency(concurrency);
        }
        if let Some(max_attempts) = upload.max_attempts {
            options = options.with_retry(RetrySettings {
                max_attempts,
                ..RetrySettings::default()
            });
        }

        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objstore_transfer_common::MIB;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.namespace, "default");
        assert!(!config.path_style);
        assert!(config.upload.multipart);
        assert!(config.upload.parallel);
    }

    #[test]
    fn test_load_profile_with_sizes() {
        let file = write_config(
            r#"
[default]
namespace = "tenancy"

[default.upload]
part_size = "64MiB"
multipart_threshold = 1048576
concurrency = 8
verify_checksum = true

[local]
endpoint = "http://localhost:9000"
path_style = true
"#,
        );

        let config = Config::load_file(file.path(), "default").unwrap();
        assert_eq!(config.namespace, "tenancy");

        let options = config.upload_options().unwrap();
        assert_eq!(options.part_size, 64 * MIB);
        assert_eq!(options.threshold(), MIB);
        assert_eq!(options.max_concurrency, 8);
        assert!(options.enable_checksum_verification);

        let local = Config::load_file(file.path(), "local").unwrap();
        assert_eq!(local.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(local.storage_settings().force_path_style);
    }

    #[test]
    fn test_missing_profile() {
        let file = write_config("[default]\nregion = \"eu-west-1\"\n");
        assert!(Config::load_file(file.path(), "production").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_file(Path::new("/nonexistent/config.toml"), "default").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_size_is_reported() {
        let file = write_config("[default.upload]\npart_size = \"lots\"\n");
        let config = Config::load_file(file.path(), "default").unwrap();
        assert!(config.upload_options().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OBJSTORE_ENDPOINT", "http://objstore:9000"),
            ("AWS_ENDPOINT_URL", "http://aws:9000"),
            ("OBJSTORE_NAMESPACE", "ns"),
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AWS_REGION", "ap-south-1"),
        ]);

        let mut config = Config::default();
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.endpoint.as_deref(), Some("http://aws:9000"));
        assert_eq!(config.namespace, "ns");
        assert_eq!(config.region, "ap-south-1");

        let settings = config.storage_settings();
        let credentials = settings.credentials.unwrap();
        assert_eq!(credentials.access_key_id, "AKID");
        assert_eq!(credentials.secret_access_key, "secret");
    }

    #[test]
    fn test_partial_credentials_use_default_chain() {
        let config = Config {
            access_key: Some("AKID".into()),
            ..Config::default()
        };
        assert!(config.storage_settings().credentials.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let mut profiles = HashMap::new();
        profiles.insert(
            "default".to_string(),
            Config {
                endpoint: Some("http://localhost:9000".to_string()),
                ..Config::default()
            },
        );

        let config_file = ConfigFile { profiles };
        let toml = toml::to_string(&config_file).unwrap();

        assert!(toml.contains("endpoint"));
        assert!(toml.contains("localhost:9000"));
    }
}
