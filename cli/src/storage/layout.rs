//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::file::File;

/// Name of the cached connection file in the user's home directory
pub const CONNECTION_FILE_NAME: &str = ".appsync.config";

/// Where the client keeps its local state
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Get the cached connection (login session) file
    pub fn connection_file(&self) -> File {
        File::new(self.base_dir.join(CONNECTION_FILE_NAME))
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        let base_dir = std::env::var_os("LOCALAPPDATA")
            .or_else(|| std::env::var_os("HOME"))
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Self::new(base_dir)
    }
}
