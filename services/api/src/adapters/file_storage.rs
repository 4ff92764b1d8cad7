//! services/api/src/adapters/file_storage.rs
//!
//! This module contains the file storage adapter, the concrete implementation
//! of the `StorageBackend` port used by the service. Each key is one JSON file
//! in the data directory, replaced atomically (temp file + rename) on write.

use async_trait::async_trait;
use flower_timer_core::{PortError, PortResult, StorageBackend};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A storage adapter that implements the `StorageBackend` port on the local disk.
#[derive(Clone, Debug)]
pub struct FileStorageAdapter {
    dir: PathBuf,
}

impl FileStorageAdapter {
    /// Creates a new `FileStorageAdapter` rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the data directory if needed. Called once at startup so a
    /// misconfigured path is reported before the server starts.
    pub async fn ensure_dir(&self) -> PortResult<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            PortError::Storage(format!("cannot create {}: {}", self.dir.display(), e))
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

//=========================================================================================
// `StorageBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl StorageBackend for FileStorageAdapter {
    async fn read(&self, key: &str) -> PortResult<Option<String>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PortError::Storage(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn write(&self, key: &str, value: &str) -> PortResult<()> {
        let path = self.path_for(key);
        let tmp_path = self.dir.join(format!(".{}.json.tmp", key));
        let io = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&tmp_path, value).await?;
            tokio::fs::rename(&tmp_path, &path).await
        };
        io.await.map_err(|e: std::io::Error| {
            PortError::Storage(format!("cannot write {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FileStorageAdapter::new(dir.path());
        assert!(adapter.read("flowerPomodoro").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn writes_replace_the_whole_blob() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FileStorageAdapter::new(dir.path().join("nested"));
        adapter.write("flowerPomodoro", r#"{"a":1}"#).await.unwrap();
        adapter.write("flowerPomodoro", r#"{"b":2}"#).await.unwrap();

        let raw = adapter.read("flowerPomodoro").await.unwrap();
        assert_eq!(raw.as_deref(), Some(r#"{"b":2}"#));
        assert!(dir.path().join("nested/flowerPomodoro.json").exists());
        assert!(!dir.path().join("nested/.flowerPomodoro.json.tmp").exists());
    }

    #[tokio::test]
    async fn unreadable_path_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the document file should be.
        std::fs::create_dir(dir.path().join("flowerPomodoro.json")).unwrap();
        let adapter = FileStorageAdapter::new(dir.path());
        assert!(matches!(
            adapter.read("flowerPomodoro").await,
            Err(PortError::Storage(_))
        ));
        assert!(matches!(
            adapter.write("flowerPomodoro", "{}").await,
            Err(PortError::Storage(_))
        ));
    }
}
