//! API models

use serde::{Deserialize, Serialize};

/// Release metadata sent alongside a package
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_disabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_mandatory: Option<bool>,

    /// Label of the release being patched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Percentage of users eligible for the release (1-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollout: Option<u8>,
}

impl PackageInfo {
    /// True when no updatable property is set
    pub fn is_empty(&self) -> bool {
        self.app_version.is_none()
            && self.description.is_none()
            && self.is_disabled.is_none()
            && self.is_mandatory.is_none()
            && self.rollout.is_none()
    }
}

/// A released package as reported by the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Empty when the server omits it
    #[serde(default)]
    pub label: String,
    pub app_version: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_mandatory: bool,
    #[serde(default)]
    pub is_disabled: bool,
    pub rollout: Option<u8>,
    pub package_hash: Option<String>,
    pub size: Option<u64>,
    pub blob_url: Option<String>,
    pub upload_time: Option<i64>,
    pub release_method: Option<String>,
    pub original_label: Option<String>,
    pub original_deployment: Option<String>,
    pub released_by: Option<String>,
}

/// Envelope of release and promote responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageResponse {
    pub package: Package,
}

/// Body of a patch release request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfoRequest {
    pub package_info: PackageInfo,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}
