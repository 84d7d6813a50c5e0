//! HTTP transport tests against a mock management service

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appsync::authn::SessionGuard;
use appsync::errors::{ApiError, OFFLINE_HINT};
use appsync::filesys::file::File;
use appsync::http::client::{CLI_VERSION_HEADER, SDK_VERSION};
use appsync::http::progress::ProgressFn;
use appsync::http::{ClientOptions, HttpClient, ManagementApi};
use openapi_client::models::PackageInfo;

use crate::support::project_dir;

const RELEASE_PATH: &str = "/apps/App/deployments/Staging/release";

fn client(server_url: &str, archive_dir: PathBuf) -> HttpClient {
    let mut options = ClientOptions::new(server_url, SecretString::from("key-123".to_string()));
    options.archive_dir = Some(archive_dir);
    HttpClient::new(options).unwrap()
}

fn recorder() -> (ProgressFn, Arc<Mutex<Vec<f64>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress: ProgressFn = Arc::new(move |p| sink.lock().unwrap().push(p));
    (progress, seen)
}

fn body_contains(body: &[u8], needle: &str) -> bool {
    body.windows(needle.len()).any(|w| w == needle.as_bytes())
}

fn dir_is_empty(dir: &std::path::Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

#[tokio::test]
async fn test_release_directory_uploads_and_cleans_up() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RELEASE_PATH))
        .and(header("Authorization", "Bearer key-123"))
        .and(header("Accept", "application/vnd.code-push.v2+json"))
        .and(header(CLI_VERSION_HEADER, SDK_VERSION))
        .and(header("X-CodePush-SDK-Version", SDK_VERSION))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "package": { "label": "v7" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let work = tempfile::tempdir().unwrap();
    let project = project_dir(work.path());
    let archives = tempfile::tempdir().unwrap();
    let (progress, seen) = recorder();

    let package = client(&server.uri(), archives.path().to_path_buf())
        .release(
            "App",
            "Staging",
            &project,
            "^1.0.0",
            PackageInfo::default(),
            Some(progress),
        )
        .await
        .unwrap();

    assert_eq!(package.label, "v7");
    assert!(dir_is_empty(archives.path()));

    let requests = server.received_requests().await.unwrap();
    let body = &requests[0].body;
    assert!(body_contains(body, "name=\"package\"; filename=\""));
    assert!(body_contains(body, "name=\"packageInfo\""));
    assert!(body_contains(body, "\"appVersion\":\"^1.0.0\""));

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[1] >= w[0]));
    assert_eq!(*seen.last().unwrap(), 100.0);
}

#[tokio::test]
async fn test_server_error_message_and_cleanup() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RELEASE_PATH))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "Storage unavailable" })),
        )
        .mount(&server)
        .await;

    let work = tempfile::tempdir().unwrap();
    let project = project_dir(work.path());
    let archives = tempfile::tempdir().unwrap();

    let err = client(&server.uri(), archives.path().to_path_buf())
        .release("App", "Staging", &project, "1.0.0", PackageInfo::default(), None)
        .await
        .unwrap_err();

    assert_eq!(
        err.as_api_error(),
        Some(&ApiError::new("Storage unavailable", 500))
    );
    assert!(dir_is_empty(archives.path()));
}

#[tokio::test]
async fn test_conflict_keeps_raw_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RELEASE_PATH))
        .respond_with(ResponseTemplate::new(409).set_body_string("Release already exists"))
        .mount(&server)
        .await;

    let work = tempfile::tempdir().unwrap();
    let project = project_dir(work.path());

    let err = client(&server.uri(), work.path().to_path_buf())
        .release("App", "Staging", &project, "1.0.0", PackageInfo::default(), None)
        .await
        .unwrap_err();

    let api_error = err.as_api_error().unwrap();
    assert!(api_error.is_conflict());
    assert_eq!(api_error.message, "Release already exists");
}

#[tokio::test]
async fn test_unparseable_success_is_internal_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RELEASE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let work = tempfile::tempdir().unwrap();
    let project = project_dir(work.path());
    let archives = tempfile::tempdir().unwrap();

    let err = client(&server.uri(), archives.path().to_path_buf())
        .release("App", "Staging", &project, "1.0.0", PackageInfo::default(), None)
        .await
        .unwrap_err();

    assert_eq!(
        err.as_api_error(),
        Some(&ApiError::new("Could not parse response: <html>ok</html>", 500))
    );
    assert!(dir_is_empty(archives.path()));
}

#[tokio::test]
async fn test_unreachable_server_is_gateway_timeout() {
    let work = tempfile::tempdir().unwrap();
    let project = project_dir(work.path());
    let archives = tempfile::tempdir().unwrap();

    let err = client("http://127.0.0.1:1", archives.path().to_path_buf())
        .release("App", "Staging", &project, "1.0.0", PackageInfo::default(), None)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(ApiError::GATEWAY_TIMEOUT));
    assert!(dir_is_empty(archives.path()));
}

#[tokio::test]
async fn test_unknown_host_gets_offline_hint() {
    let work = tempfile::tempdir().unwrap();
    let project = project_dir(work.path());
    let archives = tempfile::tempdir().unwrap();

    let err = client("http://no-such-host.invalid", archives.path().to_path_buf())
        .release("App", "Staging", &project, "1.0.0", PackageInfo::default(), None)
        .await
        .unwrap_err();

    let api_error = err.as_api_error().unwrap();
    assert_eq!(api_error.status_code, ApiError::GATEWAY_TIMEOUT);
    assert!(
        api_error.message.starts_with(OFFLINE_HINT),
        "unexpected message: {}",
        api_error.message
    );
    assert!(dir_is_empty(archives.path()));
}

#[tokio::test]
async fn test_release_response_without_label() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RELEASE_PATH))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "package": { "appVersion": "1.0.0" } })),
        )
        .mount(&server)
        .await;

    let work = tempfile::tempdir().unwrap();
    let project = project_dir(work.path());
    let archives = tempfile::tempdir().unwrap();

    let package = client(&server.uri(), archives.path().to_path_buf())
        .release("App", "Staging", &project, "1.0.0", PackageInfo::default(), None)
        .await
        .unwrap();

    assert_eq!(package.label, "");
    assert_eq!(package.app_version.as_deref(), Some("1.0.0"));
    assert!(dir_is_empty(archives.path()));
}

#[tokio::test]
async fn test_caller_file_is_not_deleted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/apps/org~~App/deployments/Staging/release"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let work = tempfile::tempdir().unwrap();
    let bundle = work.path().join("main.jsbundle");
    std::fs::write(&bundle, b"bundle").unwrap();

    let err = client(&server.uri(), work.path().to_path_buf())
        .release("org/App", "Staging", &bundle, "1.0.0", PackageInfo::default(), None)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(500));
    assert!(bundle.exists());
}

#[tokio::test]
async fn test_unauthorized_clears_connection_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/authenticated"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let work = tempfile::tempdir().unwrap();
    let connection = work.path().join(".appsync.config");
    std::fs::write(&connection, r#"{"accessKey":"key-123"}"#).unwrap();

    let guarded = SessionGuard::new(
        client(&server.uri(), work.path().to_path_buf()),
        File::new(&connection),
    );

    // Without the flag a 401 is just "not authenticated"
    assert!(!guarded.is_authenticated(false).await.unwrap());
    assert!(connection.exists());

    let err = guarded.is_authenticated(true).await.unwrap_err();
    assert_eq!(err.status_code(), Some(401));
    assert!(!connection.exists());
}

#[tokio::test]
async fn test_patch_promote_and_rollback_requests() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(RELEASE_PATH))
        .and(body_json(json!({ "packageInfo": { "label": "v3", "isDisabled": true } })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/apps/App/deployments/Staging/promote/Production"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "package": { "label": "v4" } })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/apps/App/deployments/Production/rollback/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let work = tempfile::tempdir().unwrap();
    let client = client(&server.uri(), work.path().to_path_buf());

    let patch = PackageInfo {
        is_disabled: Some(true),
        ..Default::default()
    };
    client
        .patch_release("App", "Staging", Some("v3"), patch)
        .await
        .unwrap();

    let promoted = client
        .promote("App", "Staging", "Production", PackageInfo::default())
        .await
        .unwrap();
    assert_eq!(promoted.label, "v4");

    client.rollback("App", "Production", None).await.unwrap();
}
