//! Content-addressed blob storage on the local filesystem. The blob ref
//! is the SHA-256 of the content, so identical uploads share one file.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::StoreError;

pub struct BlobStore {
    root: PathBuf,
    max_size: Option<u64>,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            max_size: None,
        })
    }

    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    pub fn checksum(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    fn path_for(&self, checksum: &str) -> PathBuf {
        // Two-level fanout keeps directories small.
        let (prefix, rest) = checksum.split_at(2.min(checksum.len()));
        self.root.join(prefix).join(rest)
    }

    /// Store bytes, returning the content checksum used as blob ref.
    /// Writing goes through a temp file so a crash never leaves a partial
    /// blob under its final name.
    pub fn put(&self, bytes: &[u8]) -> Result<String, StoreError> {
        if let Some(max) = self.max_size {
            if bytes.len() as u64 > max {
                return Err(StoreError::BlobTooLarge {
                    size: bytes.len() as u64,
                    max,
                });
            }
        }
        let checksum = Self::checksum(bytes);
        let path = self.path_for(&checksum);
        if path.exists() {
            return Ok(checksum);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        std::fs::write(tmp.path(), bytes)?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        Ok(checksum)
    }

    pub fn get(&self, blob_ref: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(blob_ref);
        std::fs::read(&path).map_err(|_| StoreError::NotFound(format!("blob {blob_ref}")))
    }

    pub fn blob_path(&self, blob_ref: &str) -> Option<PathBuf> {
        let path = self.path_for(blob_ref);
        path.exists().then_some(path)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = BlobStore::new(dir.path()).unwrap();
        let r = blobs.put(b"pdf bytes here").unwrap();
        assert_eq!(blobs.get(&r).unwrap(), b"pdf bytes here");
        assert!(blobs.blob_path(&r).is_some());
    }

    #[test]
    fn identical_content_shares_one_ref() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = BlobStore::new(dir.path()).unwrap();
        let a = blobs.put(b"same").unwrap();
        let b = blobs.put(b"same").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn oversized_blob_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = BlobStore::new(dir.path()).unwrap().with_max_size(4);
        assert!(matches!(
            blobs.put(b"too big"),
            Err(StoreError::BlobTooLarge { .. })
        ));
    }

    #[test]
    fn missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = BlobStore::new(dir.path()).unwrap();
        assert!(matches!(
            blobs.get("deadbeef"),
            Err(StoreError::NotFound(_))
        ));
    }
}
