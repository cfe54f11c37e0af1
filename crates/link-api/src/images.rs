use std::path::PathBuf;

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Decode a base64 image payload from a JSON body.
pub fn decode_image(data: &str) -> Option<Vec<u8>> {
    B64.decode(data).ok()
}

/// On-disk image store. Files are keyed by their owning entity (user or
/// post id), so replacing an image overwrites the previous file.
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        info!("Image storage directory: {}", self.dir.display());
        Ok(())
    }

    /// Write image bytes for `owner_id` and return the stored path.
    pub async fn store(&self, owner_id: &str, bytes: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(owner_id);
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        Ok(path.to_string_lossy().into_owned())
    }

    /// Apply the delete/replace rules shared by profile and post updates:
    /// `delete` clears any stored image regardless of attachment;
    /// otherwise an attached payload replaces the current one. Returns
    /// the path to record.
    pub async fn apply_update(
        &self,
        owner_id: &str,
        current: &str,
        delete: bool,
        attachment: Option<&[u8]>,
    ) -> Result<String> {
        if delete {
            if !self.delete(current).await {
                anyhow::bail!("failed to delete image {current}");
            }
            return Ok(String::new());
        }
        if let Some(bytes) = attachment {
            return self.store(owner_id, bytes).await;
        }
        Ok(current.to_string())
    }

    /// Delete a stored image. A missing file counts as success; anything
    /// else is logged and reported as failure.
    pub async fn delete(&self, path: &str) -> bool {
        if path.is_empty() {
            return true;
        }

        match tokio::fs::remove_file(path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!("Failed to delete image {}: {}", path, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let path = store.store("owner-1", b"png bytes").await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"png bytes");

        assert!(store.delete(&path).await);
        assert!(tokio::fs::read(&path).await.is_err());
    }

    #[tokio::test]
    async fn replacing_overwrites_the_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let first = store.store("owner-1", b"old").await.unwrap();
        let second = store.store("owner-1", b"new").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(tokio::fs::read(&second).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn deleting_a_missing_image_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        assert!(store.delete("does/not/exist").await);
        assert!(store.delete("").await);
    }
}
