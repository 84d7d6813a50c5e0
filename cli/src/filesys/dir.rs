//! Directory operations

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::errors::AppError;

/// Directory on disk, addressed by path
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the directory exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Create the directory (and parents)
    pub async fn create(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// Delete the directory and all contents
    pub async fn delete(&self) -> Result<(), AppError> {
        if self.exists().await {
            fs::remove_dir_all(&self.path).await?;
        }
        Ok(())
    }

    /// Recursively list every file below the directory.
    ///
    /// Entries come back in directory traversal order. Symlinks are
    /// followed. Any I/O error aborts the whole walk.
    pub async fn walk_files(&self) -> Result<Vec<PathBuf>, AppError> {
        let mut files = Vec::new();
        let mut pending = vec![self.path.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if fs::metadata(&path).await?.is_dir() {
                    pending.push(path);
                } else {
                    files.push(path);
                }
            }
        }

        Ok(files)
    }

    pub fn subdir(&self, name: &str) -> Dir {
        Dir::new(self.path.join(name))
    }

    /// Create a uniquely named directory under `base`, removed when the
    /// returned guard is dropped
    pub async fn create_temp_dir(base: &Path, prefix: &str) -> Result<ScopedDir, AppError> {
        let temp_dir = base.join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        fs::create_dir_all(&temp_dir).await?;
        debug!("Created temporary directory {}", temp_dir.display());
        Ok(ScopedDir {
            dir: Dir::new(temp_dir),
        })
    }
}

/// Directory deleted with all contents when dropped
#[derive(Debug)]
pub struct ScopedDir {
    dir: Dir,
}

impl ScopedDir {
    pub fn dir(&self) -> &Dir {
        &self.dir
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(self.dir.path()) {
            Ok(()) => debug!("Removed temporary directory {}", self.dir.path().display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove temporary directory {}: {}",
                self.dir.path().display(),
                e
            ),
        }
    }
}
