//! Blob storage abstraction.
//!
//! Raw document bytes live in a blob store addressed by name; document
//! metadata lives in SQLite. The two are bridged by the `blob_ref` a store
//! returns. Backends are selected at construction time from configuration
//! and the rest of the pipeline only ever sees the trait object.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::blob_fs::FsBlobStore;
use crate::blob_s3::S3BlobStore;
use crate::config::BlobConfig;

/// Blob layer failure.
///
/// `NotFound` is reserved for a reference that names no stored blob; every
/// other failure (I/O, network, auth, bad backend state) is `Unavailable`.
#[derive(Debug)]
pub enum BlobError {
    NotFound(String),
    Unavailable(String),
}

impl fmt::Display for BlobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobError::NotFound(blob_ref) => write!(f, "blob not found: {}", blob_ref),
            BlobError::Unavailable(cause) => write!(f, "blob store unavailable: {}", cause),
        }
    }
}

impl std::error::Error for BlobError {}

/// Storage for raw document bytes.
///
/// Implementations must behave identically from the pipeline's point of
/// view:
///
/// - `store` is safe to call concurrently for distinct names. Storing to a
///   name that already exists overwrites the previous bytes
///   deterministically (so retrying a failed ingest is idempotent) and must
///   never leave a corrupt or partially written blob visible.
/// - `fetch` of a reference that names no blob fails with
///   [`BlobError::NotFound`]; any other failure is
///   [`BlobError::Unavailable`].
/// - Names are relative paths (`{record_id}/{filename}`); implementations
///   reject traversal outside their root or bucket.
///
/// # Example
///
/// ```rust,no_run
/// # use docmill::blob::BlobStore;
/// # async fn example(store: &dyn BlobStore) -> anyhow::Result<()> {
/// let blob_ref = store.store("doc-1/report.pdf", b"%PDF-1.4 ...").await?;
/// let bytes = store.fetch(&blob_ref).await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `name`, returning the reference `fetch` accepts.
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<String, BlobError>;

    /// Retrieve the bytes previously stored under `blob_ref`.
    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobError>;

    /// Cheap reachability check for the liveness probe.
    async fn probe(&self) -> Result<(), BlobError>;

    /// Backend label used in logs and health output.
    fn kind(&self) -> &'static str;
}

/// Construct the configured blob store backend.
pub async fn open_blob_store(config: &BlobConfig) -> Result<Arc<dyn BlobStore>> {
    match config.backend.as_str() {
        "filesystem" => Ok(Arc::new(FsBlobStore::new(&config.root).await?)),
        "s3" => Ok(Arc::new(S3BlobStore::new(config)?)),
        other => anyhow::bail!(
            "unknown blob backend '{}' (expected \"filesystem\" or \"s3\")",
            other
        ),
    }
}
