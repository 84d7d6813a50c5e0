//! HTTP client implementation

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Proxy, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};
use url::Url;

use openapi_client::models::ErrorResponse;

use crate::errors::{ApiError, AppError};

/// Management API version requested through the `Accept` header
pub const API_VERSION: u32 = 2;

/// Reported in the `X-CodePush-SDK-Version` header
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Custom header carrying the command line tool version
pub const CLI_VERSION_HEADER: &str = "X-CodePush-CLI-Version";

const SDK_VERSION_HEADER: &str = "x-codepush-sdk-version";

/// Options for building an [`HttpClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub server_url: String,
    pub access_key: SecretString,

    /// Extra headers sent with every request
    pub custom_headers: Vec<(String, String)>,

    /// Route every request through this proxy; `None` disables proxies
    pub proxy: Option<String>,

    /// Where temporary upload archives are written (default: system temp dir)
    pub archive_dir: Option<PathBuf>,
}

impl ClientOptions {
    pub fn new(server_url: impl Into<String>, access_key: SecretString) -> Self {
        Self {
            server_url: server_url.into(),
            access_key,
            custom_headers: vec![(CLI_VERSION_HEADER.to_string(), SDK_VERSION.to_string())],
            proxy: None,
            archive_dir: None,
        }
    }
}

/// HTTP client for the management service
pub struct HttpClient {
    client: Client,
    base_url: Url,
    archive_dir: PathBuf,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(options: ClientOptions) -> Result<Self, AppError> {
        let base_url = Url::parse(&options.server_url).map_err(|e| {
            AppError::ConfigError(format!("Invalid server URL \"{}\": {}", options.server_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::ConfigError(format!(
                "Invalid server URL \"{}\"",
                options.server_url
            )));
        }

        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .default_headers(default_headers(&options)?);
        builder = match &options.proxy {
            Some(proxy) => {
                debug!("Using proxy {}", proxy);
                builder.proxy(Proxy::all(proxy.as_str())?)
            }
            None => builder.no_proxy(),
        };

        let archive_dir = options.archive_dir.unwrap_or_else(std::env::temp_dir);

        Ok(Self {
            client: builder.build()?,
            base_url,
            archive_dir,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Directory for temporary upload archives
    pub fn archive_dir(&self) -> &std::path::Path {
        &self.archive_dir
    }

    /// Build an endpoint URL; every segment is percent-encoded
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::ConfigError(format!("Invalid server URL \"{}\"", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a request against an endpoint
    pub fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, AppError> {
        let url = self.endpoint(segments)?;
        debug!("{} {}", method, url);
        Ok(self.client.request(method, url))
    }

    /// Send a JSON request and return the body of a successful response
    pub async fn send_json<B: Serialize>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<String, AppError> {
        let mut request = self.request(method, segments)?;
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = send(request).await?;
        Ok(read_success(response).await?)
    }

    /// Make a POST request, expecting a JSON response body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, AppError> {
        let text = self.send_json(Method::POST, segments, Some(body)).await?;
        Ok(parse_json(&text)?)
    }

    /// Make a POST request without body, ignoring the response body
    pub async fn post_empty(&self, segments: &[&str]) -> Result<(), AppError> {
        self.send_json::<()>(Method::POST, segments, None).await?;
        Ok(())
    }

    /// Make a PATCH request, ignoring the response body
    pub async fn patch<B: Serialize>(&self, segments: &[&str], body: &B) -> Result<(), AppError> {
        self.send_json(Method::PATCH, segments, Some(body)).await?;
        Ok(())
    }

    /// GET `/authenticated`
    pub async fn check_authenticated(&self, throw_if_unauthorized: bool) -> Result<bool, AppError> {
        let response = send(self.request(Method::GET, &["authenticated"])?).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if throw_if_unauthorized {
                let text = response.text().await.unwrap_or_default();
                return Err(error_from_body(StatusCode::UNAUTHORIZED, &text).into());
            }
            return Ok(false);
        }

        read_success(response).await?;
        Ok(true)
    }
}

/// Server-side form of an app name: the first `/` becomes `~~`
pub fn app_name_param(app_name: &str) -> String {
    app_name.replacen('/', "~~", 1)
}

fn default_headers(options: &ClientOptions) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();

    for (name, value) in &options.custom_headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AppError::ConfigError(format!("Invalid header name \"{}\": {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| AppError::ConfigError(format!("Invalid header value for {}: {}", name, e)))?;
        headers.insert(name, value);
    }

    headers.insert(
        header::ACCEPT,
        HeaderValue::from_str(&format!("application/vnd.code-push.v{}+json", API_VERSION))
            .map_err(|e| AppError::Internal(e.to_string()))?,
    );

    let mut authorization =
        HeaderValue::from_str(&format!("Bearer {}", options.access_key.expose_secret()))
            .map_err(|_| AppError::ConfigError("Access key contains invalid characters".to_string()))?;
    authorization.set_sensitive(true);
    headers.insert(header::AUTHORIZATION, authorization);

    headers.insert(SDK_VERSION_HEADER, HeaderValue::from_static(SDK_VERSION));
    Ok(headers)
}

/// Send a request; no response at all becomes a 504 `ApiError`
pub(crate) async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
    request.send().await.map_err(|e| {
        error!("Request failed: {}", e);
        ApiError::from_transport(&e)
    })
}

/// Body of a 2xx response; other statuses become an `ApiError`
pub(crate) async fn read_success(response: Response) -> Result<String, ApiError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::from_transport(&e))?;

    if !status.is_success() {
        error!("HTTP {} failed: {}", status, text);
        return Err(error_from_body(status, &text));
    }
    Ok(text)
}

/// Decode a 2xx body; garbage is reported as an internal server error
pub(crate) fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|_| ApiError::unparseable(text))
}

/// Server `message` when the body is a JSON error, else the raw text
fn error_from_body(status: StatusCode, text: &str) -> ApiError {
    let message = match serde_json::from_str::<ErrorResponse>(text) {
        Ok(body) if !body.message.is_empty() => body.message,
        _ if !text.is_empty() => text.to_string(),
        _ => status.to_string(),
    };
    ApiError::new(message, status.as_u16())
}
