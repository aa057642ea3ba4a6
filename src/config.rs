use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub blob: BlobConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BlobConfig {
    #[serde(default = "default_blob_backend")]
    pub backend: String,
    /// Root directory for the filesystem backend.
    #[serde(default = "default_blob_root")]
    pub root: PathBuf,
    /// Bucket for the s3 backend.
    #[serde(default)]
    pub bucket: String,
    /// Key prefix for the s3 backend.
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            backend: default_blob_backend(),
            root: default_blob_root(),
            bucket: String::new(),
            prefix: String::new(),
            region: default_region(),
            endpoint_url: None,
        }
    }
}

fn default_blob_backend() -> String {
    "filesystem".to_string()
}
fn default_blob_root() -> PathBuf {
    PathBuf::from("blobs")
}
fn default_region() -> String {
    "us-east-1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    1000
}
fn default_overlap_chars() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8087".to_string()
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate chunking policy
    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }
    if config.chunking.overlap_chars == 0 || config.chunking.overlap_chars >= config.chunking.max_chars
    {
        anyhow::bail!(
            "chunking.overlap_chars must satisfy 0 < overlap_chars < max_chars (got overlap_chars={}, max_chars={})",
            config.chunking.overlap_chars,
            config.chunking.max_chars
        );
    }

    // Validate blob backend selection
    match config.blob.backend.as_str() {
        "filesystem" => {
            if config.blob.root.as_os_str().is_empty() {
                anyhow::bail!("blob.root must be set for the filesystem backend");
            }
        }
        "s3" => {
            if config.blob.bucket.is_empty() {
                anyhow::bail!("blob.bucket must be set for the s3 backend");
            }
        }
        other => anyhow::bail!(
            "Unknown blob backend: '{}'. Must be filesystem or s3.",
            other
        ),
    }

    if config.server.max_upload_bytes == 0 {
        anyhow::bail!("server.max_upload_bytes must be > 0");
    }

    Ok(())
}
