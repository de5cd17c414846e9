//! Binary object storage behind a small upload/download/delete contract.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::config::StorageConfig;

/// Hex digits of the content hash used as a name when the caller gives none
const HASH_NAME_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `path/preferred_name` (or a content hash) and
    /// return its public URL
    async fn upload(&self, bytes: Vec<u8>, path: &str, preferred_name: Option<&str>) -> Result<String, StorageError>;

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Relative, `/`-separated, no empty, `.` or `..` segments
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidPath(key.to_string()));
    }
    if key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
        return Err(StorageError::InvalidPath(key.to_string()));
    }
    Ok(())
}

pub fn object_key(path: &str, preferred_name: Option<&str>, bytes: &[u8]) -> Result<String, StorageError> {
    let name = match preferred_name {
        Some(name) if name.contains('/') => return Err(StorageError::InvalidPath(name.to_string())),
        Some(name) => name.to_string(),
        None => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            format!("{:x}", hasher.finalize())[..HASH_NAME_LEN].to_string()
        }
    };
    let key = format!("{}/{}", path.trim_end_matches('/'), name);
    validate_key(&key)?;
    Ok(key)
}

/// Objects as files under a root directory
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.root, &config.public_base_url)
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }

    fn file_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }
}

fn not_found(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |err| match err.kind() {
        ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
        _ => StorageError::Io(err),
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, bytes: Vec<u8>, path: &str, preferred_name: Option<&str>) -> Result<String, StorageError> {
        let key = object_key(path, preferred_name, &bytes)?;
        let file = self.file_path(&key)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file, &bytes).await?;
        debug!("Stored object {} ({} bytes)", key, bytes.len());
        Ok(self.url_for(&key))
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let file = self.file_path(key)?;
        tokio::fs::read(&file).await.map_err(not_found(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let file = self.file_path(key)?;
        tokio::fs::remove_file(&file).await.map_err(not_found(key))?;
        debug!("Deleted object {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_must_stay_inside_the_root() {
        for bad in ["", "/etc/passwd", "a//b", "a/../b", "..", "a/./b", "a\\b", "a/"] {
            assert!(validate_key(bad).is_err(), "{:?} accepted", bad);
        }
        assert!(validate_key("files/report.pdf").is_ok());
    }

    #[test]
    fn object_key_uses_hash_without_name() {
        let key = object_key("files", None, b"hello").unwrap();
        assert_eq!(key, "files/2cf24dba5fb0a30e");
        assert_eq!(object_key("files/", Some("a.txt"), b"").unwrap(), "files/a.txt");
        assert!(object_key("files", Some("../a"), b"").is_err());
    }

    #[tokio::test]
    async fn upload_download_delete() {
        let root = std::env::temp_dir().join(format!("content-api-{}", uuid::Uuid::new_v4()));
        let store = LocalObjectStore::new(&root, "http://cdn.test/");

        let url = store.upload(b"data".to_vec(), "docs/2024", Some("a.txt")).await.unwrap();
        assert_eq!(url, "http://cdn.test/docs/2024/a.txt");
        assert_eq!(store.download("docs/2024/a.txt").await.unwrap(), b"data");

        store.delete("docs/2024/a.txt").await.unwrap();
        assert!(matches!(store.download("docs/2024/a.txt").await, Err(StorageError::NotFound(_))));
        assert!(matches!(store.delete("docs/2024/a.txt").await, Err(StorageError::NotFound(_))));

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
