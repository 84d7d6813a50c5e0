//! Manifest builder: turns a package path into archive entries

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::errors::AppError;
use crate::filesys::dir::Dir;

/// One archive member: where it comes from and where it goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub source_path: PathBuf,
    /// Always `/` separated
    pub archive_path: String,
}

/// Ordered, duplicate-free list of archive entries
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    seen: HashSet<String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; a repeated archive path is a packaging defect
    pub fn push(&mut self, entry: ManifestEntry) -> Result<(), AppError> {
        if !self.seen.insert(entry.archive_path.clone()) {
            return Err(AppError::PackagingError(format!(
                "Duplicate archive entry \"{}\" (from {})",
                entry.archive_path,
                entry.source_path.display()
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn archive_paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.archive_path.as_str())
    }

    fn sort(&mut self) {
        self.entries
            .sort_by(|a, b| a.archive_path.cmp(&b.archive_path));
    }
}

/// Build the manifest for a single file or a directory.
///
/// A file becomes one entry named after its base name. A directory is
/// walked recursively and every file is placed relative to the
/// directory's parent, so the directory name itself is the archive root.
/// Entries are sorted by archive path.
pub async fn build_manifest(package_path: &Path) -> Result<Manifest, AppError> {
    let metadata = fs::metadata(package_path).await?;
    let mut manifest = Manifest::new();

    if !metadata.is_dir() {
        let name = package_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AppError::PackagingError(format!(
                    "Cannot package \"{}\": path has no file name",
                    package_path.display()
                ))
            })?;
        manifest.push(ManifestEntry {
            source_path: package_path.to_path_buf(),
            archive_path: name,
        })?;
        return Ok(manifest);
    }

    let package_dir = fs::canonicalize(package_path).await?;
    let base_dir = package_base_dir(&package_dir);
    for file in Dir::new(&package_dir).walk_files().await? {
        let archive_path = archive_relative_path(&base_dir, &file)?;
        manifest.push(ManifestEntry {
            source_path: file,
            archive_path,
        })?;
    }
    manifest.sort();

    debug!(
        "Built manifest for {} with {} entries",
        package_path.display(),
        manifest.len()
    );
    Ok(manifest)
}

/// Parent of the package directory; archive paths are relative to it
pub fn package_base_dir(package_dir: &Path) -> PathBuf {
    package_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| package_dir.to_path_buf())
}

/// Path of `file` relative to `base`, joined with `/` whatever the host
/// separator is. `.` and `..` components are resolved lexically.
pub fn archive_relative_path(base: &Path, file: &Path) -> Result<String, AppError> {
    let base = normalize_lexically(base);
    let file = normalize_lexically(file);
    let relative = file.strip_prefix(&base).map_err(|_| {
        AppError::PackagingError(format!(
            "{} is not inside {}",
            file.display(),
            base.display()
        ))
    })?;

    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
