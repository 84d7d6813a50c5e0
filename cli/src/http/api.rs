//! Management API seam used by the release pipeline

use std::path::Path;

use async_trait::async_trait;
use openapi_client::models::{Package, PackageInfo};

use crate::errors::AppError;
use crate::http::progress::ProgressFn;

/// Operations the release pipeline needs from the management service.
///
/// Every failure that came from the service (or from failing to reach it)
/// is an `AppError::ApiError`.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Check the access key. A 401 yields `Ok(false)` unless
    /// `throw_if_unauthorized` is set.
    async fn is_authenticated(&self, throw_if_unauthorized: bool) -> Result<bool, AppError>;

    /// Upload a package directory or file as a new release
    async fn release(
        &self,
        app_name: &str,
        deployment_name: &str,
        package_path: &Path,
        target_binary_version: &str,
        package_info: PackageInfo,
        progress: Option<ProgressFn>,
    ) -> Result<Package, AppError>;

    /// Update the metadata of a release, the latest one when `label` is
    /// `None`
    async fn patch_release(
        &self,
        app_name: &str,
        deployment_name: &str,
        label: Option<&str>,
        package_info: PackageInfo,
    ) -> Result<(), AppError>;

    /// Copy the latest release of one deployment to another
    async fn promote(
        &self,
        app_name: &str,
        source_deployment: &str,
        destination_deployment: &str,
        package_info: PackageInfo,
    ) -> Result<Package, AppError>;

    /// Roll a deployment back to its previous release, or to `target_release`
    async fn rollback(
        &self,
        app_name: &str,
        deployment_name: &str,
        target_release: Option<&str>,
    ) -> Result<(), AppError>;
}
