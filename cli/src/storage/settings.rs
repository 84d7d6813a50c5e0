//! Connection settings management

use secrecy::SecretString;
use serde::Deserialize;

use crate::errors::AppError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Default management service
pub const DEFAULT_SERVER_URL: &str = "https://appsync-server.herokuapp.com";

/// Cached login session, written by the login flow
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Access key used as bearer credential
    pub access_key: SecretString,

    /// Custom server URL for internal debugging
    #[serde(default)]
    pub custom_server_url: Option<String>,

    /// Explicit proxy, overriding the environment
    #[serde(default)]
    pub proxy: Option<String>,

    /// Ignore every proxy, including the environment ones
    #[serde(default)]
    pub no_proxy: bool,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Settings {
    /// Load the connection file, failing with a login hint when absent
    pub async fn load(file: &File) -> Result<Self, AppError> {
        if !file.exists().await {
            return Err(AppError::ConfigError(
                "You are not currently logged in. Run the 'appsync login' command to authenticate with the AppSync server.".to_string(),
            ));
        }
        file.read_json().await
    }

    /// Server to talk to
    pub fn server_url(&self) -> &str {
        self.custom_server_url
            .as_deref()
            .unwrap_or(DEFAULT_SERVER_URL)
    }

    /// Resolve the proxy from settings, then the environment
    pub fn resolve_proxy(&self) -> Option<String> {
        resolve_proxy(self.proxy.as_deref(), self.no_proxy, |name| {
            std::env::var(name).ok()
        })
    }
}

/// Explicit proxy wins; otherwise the first of the usual environment
/// variables; `no_proxy` disables both
pub fn resolve_proxy<F>(proxy: Option<&str>, no_proxy: bool, env: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if no_proxy {
        return None;
    }
    if let Some(proxy) = proxy.filter(|p| !p.is_empty()) {
        return Some(proxy.to_string());
    }
    ["HTTPS_PROXY", "https_proxy", "HTTP_PROXY", "http_proxy"]
        .iter()
        .find_map(|name| env(name).filter(|v| !v.is_empty()))
}

/// Remove the cached connection so the next command asks for a login
pub async fn delete_connection_info(file: &File) -> Result<(), AppError> {
    file.delete().await
}
