//! Filesystem blob store.
//!
//! Blobs live under a root directory at their sanitized relative path.
//! Writes land in a temp file that is synced and renamed into place, so a
//! reader or a crashed writer never observes a partial blob.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::blob::{BlobError, BlobStore};

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self, BlobError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            BlobError::Unavailable(format!(
                "cannot create blob root {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    /// Resolve a blob name to a path under the root. Names containing
    /// traversal or absolute components resolve to nothing.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        let rel = Path::new(name);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(rel))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<String, BlobError> {
        let path = self
            .resolve(name)
            .ok_or_else(|| BlobError::Unavailable(format!("invalid blob name: {}", name)))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BlobError::Unavailable(e.to_string()))?;
        }

        let tmp = self.root.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| BlobError::Unavailable(e.to_string()))?;
        file.write_all(bytes)
            .await
            .map_err(|e| BlobError::Unavailable(e.to_string()))?;
        file.sync_all()
            .await
            .map_err(|e| BlobError::Unavailable(e.to_string()))?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(BlobError::Unavailable(e.to_string()));
        }
        Ok(name.to_string())
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobError> {
        let path = self
            .resolve(blob_ref)
            .ok_or_else(|| BlobError::NotFound(blob_ref.to_string()))?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(blob_ref.to_string()))
            }
            Err(e) => Err(BlobError::Unavailable(e.to_string())),
        }
    }

    async fn probe(&self) -> Result<(), BlobError> {
        // Round-trip a marker so reachable means writable, not just present.
        let marker = self.root.join(".probe");
        tokio::fs::write(&marker, b"ok")
            .await
            .map_err(|e| BlobError::Unavailable(format!("probe write failed: {}", e)))?;
        let read = tokio::fs::read(&marker)
            .await
            .map_err(|e| BlobError::Unavailable(format!("probe read failed: {}", e)))?;
        let _ = tokio::fs::remove_file(&marker).await;
        if read != b"ok" {
            return Err(BlobError::Unavailable("probe read mismatch".to_string()));
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "filesystem"
    }
}
