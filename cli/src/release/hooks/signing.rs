//! Signing hook: writes (or clears) the release signature

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::http::api::ManagementApi;
use crate::logs::Logger;
use crate::models::command::ReleaseCommand;
use crate::package::claims::{claims_file_path, SignedClaims};
use crate::package::hash::generate_package_hash;
use crate::release::pipeline::ReleaseHook;

/// Prefix of the temporary directory a single file is staged in
const STAGING_PREFIX: &str = "appsync";

/// Name of the package directory wrapping a staged single file
const STAGED_PACKAGE_DIR: &str = "AppSync";

/// Signs directory packages with an RSA key, and removes leftover
/// signatures from unsigned releases
pub struct SigningHook {
    logger: Logger,
    staging_root: PathBuf,
}

impl SigningHook {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            staging_root: std::env::temp_dir(),
        }
    }

    /// Base directory for single-file staging
    pub fn with_staging_root(mut self, staging_root: impl Into<PathBuf>) -> Self {
        self.staging_root = staging_root.into();
        self
    }

    /// Remove `<package_dir>/.appsyncrelease` if present
    async fn delete_previous_signature(&self, package_dir: &Path) -> Result<(), AppError> {
        let signature_path = claims_file_path(package_dir);

        match fs::OpenOptions::new().read(true).open(&signature_path).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                debug!("Cannot access {}: {}", signature_path.display(), e);
                return Err(AppError::PackagingError(format!(
                    "Could not delete previous release signature at {}.\nPlease, check your access rights.",
                    signature_path.display()
                )));
            }
        }

        (self.logger)(&format!(
            "Deleting previous release signature at {}",
            signature_path.display()
        ));
        File::new(&signature_path).delete().await
    }

    async fn sign(&self, current: ReleaseCommand, key_path: &Path) -> Result<ReleaseCommand, AppError> {
        let private_key = File::new(key_path).read_bytes().await.map_err(|_| {
            AppError::PackagingError(format!(
                "The path specified for the signing key (\"{}\") was not valid",
                key_path.display()
            ))
        })?;

        let current = if fs::metadata(&current.package_path).await?.is_dir() {
            current
        } else {
            self.stage_single_file(current).await?
        };

        self.delete_previous_signature(&current.package_path).await?;

        let content_hash = generate_package_hash(&current.package_path).await?;
        let token = SignedClaims::new(content_hash)
            .sign(&private_key)
            .map_err(|_| {
                AppError::PackagingError("The specified signing key file was not valid".to_string())
            })?;

        let signature_path = claims_file_path(&current.package_path);
        File::new(&signature_path).write_string(&token).await?;
        (self.logger)(&format!(
            "Generated a release signature and wrote it to {}",
            signature_path.display()
        ));

        Ok(current)
    }

    /// Copy a single file into `<staging>/AppSync/` so the signature can sit
    /// next to it
    async fn stage_single_file(&self, current: ReleaseCommand) -> Result<ReleaseCommand, AppError> {
        let staging = Dir::create_temp_dir(&self.staging_root, STAGING_PREFIX).await?;
        let package_dir = staging.dir().subdir(STAGED_PACKAGE_DIR);
        package_dir.create().await?;

        File::new(&current.package_path)
            .copy_into(package_dir.path())
            .await?;
        info!(
            "Staged {} in {}",
            current.package_path.display(),
            package_dir.path().display()
        );

        Ok(current.with_staged_package(package_dir.path().to_path_buf(), Arc::new(staging)))
    }
}

#[async_trait]
impl ReleaseHook for SigningHook {
    fn name(&self) -> &str {
        "signing"
    }

    async fn run(
        &self,
        current: ReleaseCommand,
        _original: &ReleaseCommand,
        _client: &dyn ManagementApi,
    ) -> Result<ReleaseCommand, AppError> {
        let key_path = match current.signing_key_path.clone() {
            Some(key_path) => key_path,
            None => {
                if fs::metadata(&current.package_path).await?.is_dir() {
                    self.delete_previous_signature(&current.package_path).await?;
                }
                return Ok(current);
            }
        };

        self.sign(current, &key_path)
            .await
            .map_err(|e| match e {
                AppError::SigningError(_) => e,
                other => AppError::SigningError(other.to_string()),
            })
    }
}
