//! Filesystem-backed blob tier.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::AssetId;
use crate::util::sanitize_token;

/// Dedicated blob directory holding one file per cached asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open (and create if needed) a blob directory at the given root.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Probe for a usable blob directory at the given root.
    ///
    /// Returns `None` when the directory cannot be created, e.g. on a
    /// read-only profile. Callers degrade to the inline tier in that case.
    #[must_use]
    pub fn probe(root: impl Into<PathBuf>) -> Option<Self> {
        let root = root.into();
        match Self::open(root.clone()) {
            Ok(store) => Some(store),
            Err(error) => {
                tracing::warn!(
                    "Blob store unavailable at {}: {error}",
                    root.display()
                );
                None
            }
        }
    }

    /// Root directory of this store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: &AssetId) -> Result<PathBuf> {
        let token = sanitize_token(id.as_str());
        if token.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Asset id '{id}' has no filesystem-safe representation"
            )));
        }
        Ok(self.root.join(format!("{token}.bin")))
    }

    /// Write payload bytes for an asset, replacing any previous payload.
    pub async fn put(&self, id: &AssetId, bytes: &[u8]) -> Result<()> {
        let path = self.object_path(id)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|error| Error::Storage(format!("Blob write failed for {id}: {error}")))?;
        Ok(())
    }

    /// Read payload bytes for an asset, `None` when absent.
    pub async fn get(&self, id: &AssetId) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(Error::Storage(format!(
                "Blob read failed for {id}: {error}"
            ))),
        }
    }

    /// Delete an asset's payload; deleting a missing payload is not an error.
    pub async fn delete(&self, id: &AssetId) -> Result<()> {
        let path = self.object_path(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(Error::Storage(format!(
                "Blob delete failed for {id}: {error}"
            ))),
        }
    }

    /// Check whether a payload exists for an asset.
    pub async fn contains(&self, id: &AssetId) -> Result<bool> {
        let path = self.object_path(id)?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn id(raw: &str) -> AssetId {
        AssetId::new(raw).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_get_delete_round_trip() {
        let tmp = tempdir().unwrap();
        let store = FsBlobStore::open(tmp.path().join("blobs")).unwrap();

        let asset = id("book-1");
        store.put(&asset, b"pdf bytes").await.unwrap();
        assert_eq!(store.get(&asset).await.unwrap().unwrap(), b"pdf bytes");
        assert!(store.contains(&asset).await.unwrap());

        store.delete(&asset).await.unwrap();
        assert!(store.get(&asset).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_missing_is_not_an_error() {
        let tmp = tempdir().unwrap();
        let store = FsBlobStore::open(tmp.path().join("blobs")).unwrap();

        store.delete(&id("never-saved")).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_object_names_are_sanitized() {
        let tmp = tempdir().unwrap();
        let store = FsBlobStore::open(tmp.path().join("blobs")).unwrap();

        let asset = id("Book::One (final)");
        store.put(&asset, b"x").await.unwrap();

        assert!(tmp
            .path()
            .join("blobs")
            .join("book-one-final.bin")
            .exists());
    }

    #[test]
    fn test_probe_reports_unusable_root() {
        // A root that collides with an existing file cannot be created
        let tmp = tempdir().unwrap();
        let file_path = tmp.path().join("occupied");
        std::fs::write(&file_path, b"file").unwrap();

        assert!(FsBlobStore::probe(file_path.join("blobs")).is_none());
    }
}
