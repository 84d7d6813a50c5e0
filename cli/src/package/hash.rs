//! Package content hashing

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::errors::AppError;
use crate::filesys::dir::Dir;
use crate::package::claims::CLAIMS_FILE_NAME;
use crate::package::manifest::{archive_relative_path, package_base_dir};

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Paths that never take part in the content hash
pub fn is_ignored(relative_path: &str) -> bool {
    const MACOSX: &str = "__MACOSX/";
    const DS_STORE: &str = ".DS_Store";

    relative_path.starts_with(MACOSX)
        || relative_path == DS_STORE
        || relative_path.ends_with(&format!("/{}", DS_STORE))
        || relative_path == CLAIMS_FILE_NAME
        || relative_path.ends_with(&format!("/{}", CLAIMS_FILE_NAME))
}

/// Hash a directory's contents.
///
/// Every file contributes `"<path>:<sha256>"`, with the path taken relative
/// to the directory's parent. The sorted list is serialized as a JSON array
/// and hashed again. Files are read one after the other.
pub async fn generate_package_hash(package_dir: &Path) -> Result<String, AppError> {
    let package_dir = fs::canonicalize(package_dir).await?;
    let base_dir = package_base_dir(&package_dir);

    let mut entries = Vec::new();
    for file in Dir::new(&package_dir).walk_files().await? {
        let relative_path = archive_relative_path(&base_dir, &file)?;
        if is_ignored(&relative_path) {
            continue;
        }
        let file_hash = hash_file(&file).await?;
        entries.push(format!("{}:{}", relative_path, file_hash));
    }
    entries.sort();

    let manifest_json = serde_json::to_string(&entries)?;
    Ok(crate::utils::sha256_hash(manifest_json.as_bytes()))
}

/// Streaming SHA-256 of one file, lowercase hex
pub async fn hash_file(path: &Path) -> Result<String, AppError> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
