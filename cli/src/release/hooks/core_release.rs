//! Core release hook: archive the package and upload it

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::info;

use crate::errors::AppError;
use crate::filesys::file::TempFile;
use crate::http::api::ManagementApi;
use crate::http::progress::ProgressFn;
use crate::logs::Logger;
use crate::models::command::ReleaseCommand;
use crate::package::archive::package_to_archive;
use crate::release::pipeline::ReleaseHook;

/// Zips the current package and releases it. The archive is deleted once
/// the upload is over, whatever its outcome.
pub struct CoreReleaseHook {
    logger: Logger,
    progress: Option<ProgressFn>,
    output_dir: Option<PathBuf>,
}

impl CoreReleaseHook {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            progress: None,
            output_dir: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressFn>) -> Self {
        self.progress = progress;
        self
    }

    /// Directory for the archive; the current directory when unset
    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }
}

#[async_trait]
impl ReleaseHook for CoreReleaseHook {
    fn name(&self) -> &str {
        "core-release"
    }

    async fn run(
        &self,
        current: ReleaseCommand,
        original: &ReleaseCommand,
        client: &dyn ManagementApi,
    ) -> Result<ReleaseCommand, AppError> {
        let output_dir = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        let archive = TempFile::adopt(package_to_archive(&current.package_path, &output_dir).await?);

        client.is_authenticated(true).await?;
        let package = client
            .release(
                &current.app_name,
                &current.deployment_name,
                archive.path(),
                &current.target_binary_version,
                current.package_info(),
                self.progress.clone(),
            )
            .await?;
        info!(
            "Released {} as {}",
            original.package_path.display(),
            package.label
        );

        let kind = if fs::metadata(&original.package_path).await?.is_dir() {
            "directory"
        } else {
            "file"
        };
        (self.logger)(&format!(
            "Successfully released an update containing the \"{}\" {} to the \"{}\" deployment of the \"{}\" app.",
            original.package_path.display(),
            kind,
            current.deployment_name,
            current.app_name
        ));

        Ok(current)
    }
}
