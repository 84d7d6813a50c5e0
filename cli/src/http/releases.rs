//! Release API client

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use openapi_client::models::{Package, PackageInfo, PackageInfoRequest, PackageResponse};

use crate::errors::AppError;
use crate::filesys::file::TempFile;
use crate::http::api::ManagementApi;
use crate::http::client::{app_name_param, parse_json, read_success, send, HttpClient};
use crate::http::progress::{ProgressFn, UploadProgress};
use crate::package::archive::package_to_archive;
use crate::release::fsm::{ReleaseEvent, ReleaseFsm};

/// The file actually uploaded. Archives built by the client are removed when
/// this is dropped; files handed in by the caller are left alone.
enum UploadArchive {
    Temporary(TempFile),
    Provided(PathBuf),
}

impl UploadArchive {
    fn path(&self) -> &Path {
        match self {
            UploadArchive::Temporary(file) => file.path(),
            UploadArchive::Provided(path) => path,
        }
    }
}

impl HttpClient {
    /// Zip a directory into a temporary archive, or use a file as is
    async fn prepare_archive(&self, package_path: &Path) -> Result<UploadArchive, AppError> {
        if !tokio::fs::metadata(package_path).await?.is_dir() {
            return Ok(UploadArchive::Provided(package_path.to_path_buf()));
        }

        let archive = package_to_archive(package_path, self.archive_dir()).await?;
        debug!("Packaged {} into {}", package_path.display(), archive.display());
        Ok(UploadArchive::Temporary(TempFile::adopt(archive)))
    }

    /// Stream `archive` as the `package` field of a multipart release
    async fn upload_release(
        &self,
        segments: &[&str],
        archive: &Path,
        package_info: &PackageInfo,
        progress: Option<ProgressFn>,
    ) -> Result<Package, AppError> {
        let file = tokio::fs::File::open(archive).await?;
        let total = file.metadata().await?.len();
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "package.zip".to_string());

        let tracker = Arc::new(UploadProgress::new(total, progress));
        let counter = tracker.clone();
        let stream = ReaderStream::new(file).inspect(move |chunk| {
            if let Ok(bytes) = chunk {
                counter.advance(bytes.len() as u64);
            }
        });

        let package = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(file_name)
            .mime_str("application/zip")?;
        let form = Form::new()
            .part("package", package)
            .text("packageInfo", serde_json::to_string(package_info)?);

        info!("Uploading {} ({} bytes)", archive.display(), total);
        let request = self.request(Method::POST, segments)?.multipart(form);
        let text = read_success(send(request).await?).await?;
        let body: PackageResponse = parse_json(&text)?;

        debug!("Upload finished at {:.0}%", tracker.percent());
        Ok(body.package)
    }
}

#[async_trait]
impl ManagementApi for HttpClient {
    async fn is_authenticated(&self, throw_if_unauthorized: bool) -> Result<bool, AppError> {
        self.check_authenticated(throw_if_unauthorized).await
    }

    async fn release(
        &self,
        app_name: &str,
        deployment_name: &str,
        package_path: &Path,
        target_binary_version: &str,
        mut package_info: PackageInfo,
        progress: Option<ProgressFn>,
    ) -> Result<Package, AppError> {
        package_info.app_version = Some(target_binary_version.to_string());
        let app = app_name_param(app_name);
        let segments = ["apps", app.as_str(), "deployments", deployment_name, "release"];

        let mut fsm = ReleaseFsm::new();
        fsm.process(ReleaseEvent::Package).map_err(AppError::Internal)?;

        let archive = match self.prepare_archive(package_path).await {
            Ok(archive) => archive,
            Err(e) => {
                fsm.process(ReleaseEvent::Fail(e.to_string()))
                    .map_err(AppError::Internal)?;
                warn!("Release packaging failed: {}", e);
                return Err(e);
            }
        };

        fsm.process(ReleaseEvent::Upload).map_err(AppError::Internal)?;
        let result = self
            .upload_release(&segments, archive.path(), &package_info, progress)
            .await;
        drop(archive);

        let event = match &result {
            Ok(_) => ReleaseEvent::Succeed,
            Err(e) => ReleaseEvent::Fail(e.to_string()),
        };
        fsm.process(event).map_err(AppError::Internal)?;
        debug!("Release attempt ended in state {:?}", fsm.state());

        result
    }

    async fn patch_release(
        &self,
        app_name: &str,
        deployment_name: &str,
        label: Option<&str>,
        mut package_info: PackageInfo,
    ) -> Result<(), AppError> {
        package_info.label = label.map(str::to_string);
        let app = app_name_param(app_name);
        let body = PackageInfoRequest { package_info };
        self.patch(&["apps", app.as_str(), "deployments", deployment_name, "release"], &body)
            .await
    }

    async fn promote(
        &self,
        app_name: &str,
        source_deployment: &str,
        destination_deployment: &str,
        package_info: PackageInfo,
    ) -> Result<Package, AppError> {
        let app = app_name_param(app_name);
        let body = PackageInfoRequest { package_info };
        let response: PackageResponse = self
            .post(
                &[
                    "apps",
                    app.as_str(),
                    "deployments",
                    source_deployment,
                    "promote",
                    destination_deployment,
                ],
                &body,
            )
            .await?;
        Ok(response.package)
    }

    async fn rollback(
        &self,
        app_name: &str,
        deployment_name: &str,
        target_release: Option<&str>,
    ) -> Result<(), AppError> {
        let app = app_name_param(app_name);
        self.post_empty(&[
            "apps",
            app.as_str(),
            "deployments",
            deployment_name,
            "rollback",
            target_release.unwrap_or(""),
        ])
        .await
    }
}
