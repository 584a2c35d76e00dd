//! Access to uploaded document files. Only existence checks and deletion are needed here;
//! writing uploads belongs to the upload layer.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum FileStorageError {
    #[error("path escapes storage root: {0}")]
    InvalidPath(String),
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Identifier recorded as `storage.provider` on certificates.
    fn provider(&self) -> &str;

    async fn exists(&self, path: &str) -> Result<bool, FileStorageError>;

    /// Returns `true` if the file was deleted, `false` if it did not exist.
    async fn delete(&self, path: &str) -> Result<bool, FileStorageError>;
}

/// Files kept under a local directory.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub async fn new(root: PathBuf) -> Result<Self, FileStorageError> {
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a stored relative path onto the root, refusing anything that could leave it.
    fn resolve(&self, path: &str) -> Result<PathBuf, FileStorageError> {
        let relative = Path::new(path.trim_start_matches('/'));
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => return Err(FileStorageError::InvalidPath(path.to_string())),
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    fn provider(&self) -> &str {
        "local"
    }

    async fn exists(&self, path: &str) -> Result<bool, FileStorageError> {
        let full = self.resolve(path)?;
        Ok(fs::try_exists(full).await?)
    }

    async fn delete(&self, path: &str) -> Result<bool, FileStorageError> {
        let full = self.resolve(path)?;
        match fs::remove_file(&full).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
struct MemoryFiles {
    paths: HashSet<String>,
    deleted: Vec<String>,
    failing: bool,
}

/// Files tracked in memory, with an on/off failure switch.
#[derive(Clone, Default)]
pub struct MemoryFileStorage {
    inner: Arc<Mutex<MemoryFiles>>,
}

impl MemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, path: &str) {
        self.inner.lock().await.paths.insert(key(path));
    }

    /// Makes every subsequent call fail with an IO error until cleared.
    pub async fn set_failing(&self, failing: bool) {
        self.inner.lock().await.failing = failing;
    }

    /// Paths removed so far, in order.
    pub async fn deleted(&self) -> Vec<String> {
        self.inner.lock().await.deleted.clone()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.inner.lock().await.paths.contains(&key(path))
    }
}

fn key(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

fn unavailable() -> FileStorageError {
    FileStorageError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "file storage unavailable",
    ))
}

#[async_trait]
impl FileStorage for MemoryFileStorage {
    fn provider(&self) -> &str {
        "memory"
    }

    async fn exists(&self, path: &str) -> Result<bool, FileStorageError> {
        let inner = self.inner.lock().await;
        if inner.failing {
            return Err(unavailable());
        }
        Ok(inner.paths.contains(&key(path)))
    }

    async fn delete(&self, path: &str) -> Result<bool, FileStorageError> {
        let mut inner = self.inner.lock().await;
        if inner.failing {
            return Err(unavailable());
        }
        let path = key(path);
        if inner.paths.remove(&path) {
            inner.deleted.push(path);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
