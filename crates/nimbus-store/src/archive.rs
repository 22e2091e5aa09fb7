//! The log archive (spec §4.5, C2): durable storage for build/deploy
//! logs, addressed by opaque key (`jobs/{id}/{build|deploy}.log`).

use crate::error::StoreError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

#[async_trait]
pub trait LogArchive: Send + Sync {
    async fn put(&self, key: &str, body: &str) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[must_use]
pub fn build_log_key(job_id: &str) -> String {
    format!("jobs/{job_id}/build.log")
}

#[must_use]
pub fn deploy_log_key(job_id: &str) -> String {
    format!("jobs/{job_id}/deploy.log")
}

/// Filesystem-backed `LogArchive`, rooted at a configured directory.
/// Keys are relative paths under that root; deletion of an absent
/// object is a success, matching the edge-worker delete semantics the
/// cleanup sweeper (C9) relies on for idempotency.
pub struct FsLogArchive {
    root: PathBuf,
}

impl FsLogArchive {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.contains("..") {
            return Err(StoreError::Archive(format!("refusing traversal-looking key: {key}")));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl LogArchive for FsLogArchive {
    async fn put(&self, key: &str, body: &str) -> Result<(), StoreError> {
        let path = self.resolve(key)?;
        if let Some(parent) = Path::new(&path).parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Archive(e.to_string()))?;
        }
        fs::write(&path, body)
            .await
            .map_err(|e| StoreError::Archive(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.resolve(key)?;
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Archive(e.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Archive(e.to_string())),
        }
    }
}
