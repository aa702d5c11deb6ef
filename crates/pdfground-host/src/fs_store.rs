//! Filesystem-backed durable block store.
//!
//! Layout: `<root>/<container>/<key>`. Writes go to a sibling temp file that
//! is renamed over the slot, so a crash mid-write leaves the previous image.

use pdfground_core::{BlockStore, HistoryError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FsBlockStore {
    root: PathBuf,
}

impl FsBlockStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a slot. Container and key must be plain names.
    pub fn slot_path(&self, container: &str, key: &str) -> pdfground_core::Result<PathBuf> {
        for part in [container, key] {
            if part.is_empty() || part.contains(['/', '\\']) || part == "." || part == ".." {
                return Err(HistoryError::BlockStoreError(format!(
                    "invalid slot name: {:?}",
                    part
                )));
            }
        }
        Ok(self.root.join(container).join(key))
    }
}

impl BlockStore for FsBlockStore {
    async fn get(&self, container: &str, key: &str) -> pdfground_core::Result<Option<Vec<u8>>> {
        let path = self.slot_path(container, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, container: &str, key: &str, value: Vec<u8>) -> pdfground_core::Result<()> {
        let path = self.slot_path(container, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &value).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(
            target: "pdfground::store",
            "Wrote {} bytes to {}",
            value.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_slot_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FsBlockStore::new(dir.path());
        assert!(store.get("database", "pdfground.db").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_creates_container_and_replaces() {
        let dir = TempDir::new().unwrap();
        let store = FsBlockStore::new(dir.path().join("nested"));

        store.put("database", "pdfground.db", vec![1, 2, 3]).await.unwrap();
        store.put("database", "pdfground.db", vec![4]).await.unwrap();

        assert_eq!(
            store.get("database", "pdfground.db").await.unwrap(),
            Some(vec![4])
        );
        let path = dir.path().join("nested").join("database").join("pdfground.db");
        assert_eq!(std::fs::read(&path).unwrap(), vec![4]);
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let store = FsBlockStore::new(dir.path());
        assert!(store.put("..", "x", vec![1]).await.is_err());
        assert!(store.put("database", "a/b", vec![1]).await.is_err());
        assert!(store.get("", "x").await.is_err());
    }
}
