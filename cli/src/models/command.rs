//! Commands handed to the executor

use std::path::{Path, PathBuf};
use std::sync::Arc;

use openapi_client::models::PackageInfo;

use crate::errors::AppError;
use crate::filesys::dir::ScopedDir;
use crate::utils::is_valid_semver_range;

pub const BINARY_OR_ZIP_MESSAGE: &str = "It is unnecessary to package releases in a .zip or binary file. Please specify the direct path to the update content's directory (e.g. /platforms/ios/www) or file (e.g. main.jsbundle).";

pub const INVALID_SEMVER_MESSAGE: &str = "Please use a semver-compliant target binary version range, for example \"1.0.0\", \"*\" or \"^1.2.3\".";

pub const EMPTY_PATCH_MESSAGE: &str = "At least one property must be specified to patch a release.";

/// A release request flowing through the hook pipeline
#[derive(Debug, Clone)]
pub struct ReleaseCommand {
    pub app_name: String,
    pub deployment_name: String,

    /// Directory or single file to release
    pub package_path: PathBuf,

    /// Semver range of the binaries this update applies to
    pub target_binary_version: String,

    pub description: Option<String>,
    pub is_mandatory: bool,
    pub is_disabled: bool,

    /// Percentage of users the release reaches (1-100)
    pub rollout: Option<u8>,

    /// RSA private key (PEM) used to sign the package
    pub signing_key_path: Option<PathBuf>,

    /// Report a 409 conflict as a warning instead of an error
    pub no_duplicate_release_error: bool,

    /// Staging directory created for this release, removed with the last
    /// clone of the command
    pub staging: Option<Arc<ScopedDir>>,
}

impl ReleaseCommand {
    pub fn new(
        app_name: impl Into<String>,
        deployment_name: impl Into<String>,
        package_path: impl Into<PathBuf>,
        target_binary_version: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            deployment_name: deployment_name.into(),
            package_path: package_path.into(),
            target_binary_version: target_binary_version.into(),
            description: None,
            is_mandatory: false,
            is_disabled: false,
            rollout: None,
            signing_key_path: None,
            no_duplicate_release_error: false,
            staging: None,
        }
    }

    /// Same command pointing at a package inside `staging`
    pub fn with_staged_package(&self, package_path: PathBuf, staging: Arc<ScopedDir>) -> Self {
        Self {
            package_path,
            staging: Some(staging),
            ..self.clone()
        }
    }

    /// Metadata sent with the upload
    pub fn package_info(&self) -> PackageInfo {
        PackageInfo {
            description: self.description.clone(),
            is_disabled: Some(self.is_disabled),
            is_mandatory: Some(self.is_mandatory),
            rollout: self.rollout,
            ..Default::default()
        }
    }

    /// Checks that must pass before anything is packaged or sent
    pub fn validate(&self) -> Result<(), AppError> {
        if is_binary_or_zip(&self.package_path) {
            return Err(AppError::ValidationError(BINARY_OR_ZIP_MESSAGE.to_string()));
        }
        validate_semver_range(&self.target_binary_version)?;
        validate_rollout(self.rollout)
    }
}

/// Update the metadata of an existing release
#[derive(Debug, Clone, Default)]
pub struct PatchCommand {
    pub app_name: String,
    pub deployment_name: String,

    /// Release to patch; the latest one when absent
    pub label: Option<String>,

    pub target_binary_version: Option<String>,
    pub description: Option<String>,
    pub is_mandatory: Option<bool>,
    pub is_disabled: Option<bool>,
    pub rollout: Option<u8>,
}

impl PatchCommand {
    pub fn package_info(&self) -> PackageInfo {
        PackageInfo {
            app_version: self.target_binary_version.clone(),
            description: self.description.clone(),
            is_disabled: self.is_disabled,
            is_mandatory: self.is_mandatory,
            rollout: self.rollout,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(range) = &self.target_binary_version {
            validate_semver_range(range)?;
        }
        validate_rollout(self.rollout)?;
        if self.package_info().is_empty() {
            return Err(AppError::ValidationError(EMPTY_PATCH_MESSAGE.to_string()));
        }
        Ok(())
    }
}

/// Copy a release from one deployment to another
#[derive(Debug, Clone, Default)]
pub struct PromoteCommand {
    pub app_name: String,
    pub source_deployment: String,
    pub destination_deployment: String,

    /// Release to promote; the latest one when absent
    pub label: Option<String>,

    pub target_binary_version: Option<String>,
    pub description: Option<String>,
    pub is_mandatory: Option<bool>,
    pub is_disabled: Option<bool>,
    pub rollout: Option<u8>,
    pub no_duplicate_release_error: bool,
}

impl PromoteCommand {
    pub fn package_info(&self) -> PackageInfo {
        PackageInfo {
            app_version: self.target_binary_version.clone(),
            description: self.description.clone(),
            is_disabled: self.is_disabled,
            is_mandatory: self.is_mandatory,
            label: self.label.clone(),
            rollout: self.rollout,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(range) = &self.target_binary_version {
            validate_semver_range(range)?;
        }
        validate_rollout(self.rollout)
    }
}

/// Roll a deployment back
#[derive(Debug, Clone, Default)]
pub struct RollbackCommand {
    pub app_name: String,
    pub deployment_name: String,

    /// Release label to roll back to; the previous release when absent
    pub target_release: Option<String>,
}

/// Every command the executor knows how to run
#[derive(Debug, Clone)]
pub enum Command {
    Release(ReleaseCommand),
    Patch(PatchCommand),
    Promote(PromoteCommand),
    Rollback(RollbackCommand),
}

/// Zip archives and store binaries are never valid release content
pub fn is_binary_or_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ext == "zip" || ext == "apk" || ext == "ipa"
        })
        .unwrap_or(false)
}

pub fn validate_semver_range(range: &str) -> Result<(), AppError> {
    if !is_valid_semver_range(range) {
        return Err(AppError::ValidationError(INVALID_SEMVER_MESSAGE.to_string()));
    }
    Ok(())
}

fn validate_rollout(rollout: Option<u8>) -> Result<(), AppError> {
    match rollout {
        Some(value) if !(1..=100).contains(&value) => Err(AppError::ValidationError(format!(
            "Rollout value should be an integer between 1 and 100, got {}.",
            value
        ))),
        _ => Ok(()),
    }
}

/// Parse a rollout argument such as `25` or `25%`
pub fn parse_rollout(input: &str) -> Result<u8, AppError> {
    let value = input.trim().trim_end_matches('%');
    let rollout: u8 = value.parse().map_err(|_| {
        AppError::ValidationError(format!(
            "Rollout value should be an integer between 1 and 100, got \"{}\".",
            input
        ))
    })?;
    validate_rollout(Some(rollout))?;
    Ok(rollout)
}
