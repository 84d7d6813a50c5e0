//! Session guard: forgets the cached login when the server rejects it

use std::path::Path;

use async_trait::async_trait;
use openapi_client::models::{Package, PackageInfo};
use tracing::{info, warn};

use crate::errors::{ApiError, AppError};
use crate::filesys::file::File;
use crate::http::api::ManagementApi;
use crate::http::progress::ProgressFn;
use crate::storage::settings::delete_connection_info;

/// Wraps a client and deletes the connection file whenever a call fails
/// with 401, so the next command asks for a fresh login
pub struct SessionGuard<C> {
    inner: C,
    connection_file: File,
}

impl<C: ManagementApi> SessionGuard<C> {
    pub fn new(inner: C, connection_file: File) -> Self {
        Self {
            inner,
            connection_file,
        }
    }

    async fn guard<T: Send>(&self, result: Result<T, AppError>) -> Result<T, AppError> {
        let unauthorized = matches!(
            &result,
            Err(e) if e.as_api_error().is_some_and(ApiError::is_unauthorized)
        );
        if unauthorized {
            info!(
                "Access key rejected, removing {}",
                self.connection_file.path().display()
            );
            if let Err(e) = delete_connection_info(&self.connection_file).await {
                warn!("Failed to remove connection file: {}", e);
            }
        }
        result
    }
}

#[async_trait]
impl<C: ManagementApi> ManagementApi for SessionGuard<C> {
    async fn is_authenticated(&self, throw_if_unauthorized: bool) -> Result<bool, AppError> {
        self.guard(self.inner.is_authenticated(throw_if_unauthorized).await)
            .await
    }

    async fn release(
        &self,
        app_name: &str,
        deployment_name: &str,
        package_path: &Path,
        target_binary_version: &str,
        package_info: PackageInfo,
        progress: Option<ProgressFn>,
    ) -> Result<Package, AppError> {
        let result = self
            .inner
            .release(
                app_name,
                deployment_name,
                package_path,
                target_binary_version,
                package_info,
                progress,
            )
            .await;
        self.guard(result).await
    }

    async fn patch_release(
        &self,
        app_name: &str,
        deployment_name: &str,
        label: Option<&str>,
        package_info: PackageInfo,
    ) -> Result<(), AppError> {
        let result = self
            .inner
            .patch_release(app_name, deployment_name, label, package_info)
            .await;
        self.guard(result).await
    }

    async fn promote(
        &self,
        app_name: &str,
        source_deployment: &str,
        destination_deployment: &str,
        package_info: PackageInfo,
    ) -> Result<Package, AppError> {
        let result = self
            .inner
            .promote(app_name, source_deployment, destination_deployment, package_info)
            .await;
        self.guard(result).await
    }

    async fn rollback(
        &self,
        app_name: &str,
        deployment_name: &str,
        target_release: Option<&str>,
    ) -> Result<(), AppError> {
        let result = self
            .inner
            .rollback(app_name, deployment_name, target_release)
            .await;
        self.guard(result).await
    }
}
