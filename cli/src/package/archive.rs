//! Archive writer: streams manifest entries into a zip file

use std::fs::File as StdFile;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::AppError;
use crate::package::manifest::{build_manifest, Manifest};
use crate::utils::generate_random_filename;

/// Length of the random archive base name
pub const ARCHIVE_NAME_LENGTH: usize = 15;

/// Write `manifest` into a new `<random>.zip` inside `output_dir`.
///
/// Each source file is copied into the archive as a stream, never loaded
/// whole. On failure a partial archive may remain on disk; removing it is
/// up to the caller.
pub async fn write_archive(manifest: &Manifest, output_dir: &Path) -> Result<PathBuf, AppError> {
    let archive_path = output_dir.join(format!(
        "{}.zip",
        generate_random_filename(ARCHIVE_NAME_LENGTH)
    ));
    let entries = manifest.entries().to_vec();
    let target = archive_path.clone();

    tokio::task::spawn_blocking(move || -> Result<(), AppError> {
        let file = StdFile::create(&target)?;
        let mut zip = ZipWriter::new(BufWriter::new(file));

        for entry in &entries {
            let mut source = StdFile::open(&entry.source_path)?;
            let size = source.metadata()?.len();
            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .large_file(size >= u32::MAX as u64);

            zip.start_file(entry.archive_path.as_str(), options)?;
            io::copy(&mut source, &mut zip)?;
        }

        let mut writer = zip.finish()?;
        io::Write::flush(&mut writer)?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Internal(format!("Archive task failed: {}", e)))??;

    info!(
        "Wrote {} entries to {}",
        manifest.len(),
        archive_path.display()
    );
    Ok(archive_path)
}

/// Build the manifest for `package_path` and archive it into `output_dir`
pub async fn package_to_archive(package_path: &Path, output_dir: &Path) -> Result<PathBuf, AppError> {
    debug!("Packaging {}", package_path.display());
    let manifest = build_manifest(package_path).await?;
    write_archive(&manifest, output_dir).await
}
