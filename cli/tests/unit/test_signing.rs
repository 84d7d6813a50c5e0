//! Signing hook tests

use std::path::Path;

use appsync::errors::AppError;
use appsync::models::ReleaseCommand;
use appsync::package::claims::{read_claims, SignedClaims, CLAIMS_FILE_NAME};
use appsync::package::hash::generate_package_hash;
use appsync::release::hooks::SigningHook;
use appsync::release::pipeline::ReleaseHook;

use crate::support::{capture_logger, fixture, project_dir, FakeClient};

fn signed_command(package: &Path) -> ReleaseCommand {
    let mut command = ReleaseCommand::new("App", "Staging", package, "1.0.0");
    command.signing_key_path = Some(fixture("signing_key.pem"));
    command
}

async fn sign(hook: &SigningHook, command: ReleaseCommand) -> Result<ReleaseCommand, AppError> {
    hook.run(command.clone(), &command, &FakeClient::default()).await
}

#[tokio::test]
async fn test_signature_matches_content_and_verifies() {
    let work = tempfile::tempdir().unwrap();
    let project = project_dir(work.path());
    let (logger, lines) = capture_logger();

    let result = sign(&SigningHook::new(logger), signed_command(&project)).await.unwrap();
    assert_eq!(result.package_path, project);

    let token = std::fs::read_to_string(project.join(CLAIMS_FILE_NAME)).unwrap();
    let public_key = std::fs::read(fixture("signing_key.pub.pem")).unwrap();
    let claims = SignedClaims::verify(&token, &public_key).unwrap();

    assert_eq!(claims.claim_version, "1.0.0");
    assert_eq!(claims.content_hash, generate_package_hash(&project).await.unwrap());
    assert_eq!(
        lines.lock().unwrap().last().unwrap(),
        &format!(
            "Generated a release signature and wrote it to {}",
            project.join(CLAIMS_FILE_NAME).display()
        )
    );
}

#[tokio::test]
async fn test_resigning_is_idempotent_until_content_changes() {
    let work = tempfile::tempdir().unwrap();
    let project = project_dir(work.path());
    let (logger, _) = capture_logger();
    let hook = SigningHook::new(logger);

    sign(&hook, signed_command(&project)).await.unwrap();
    let first = read_claims(&project).await.unwrap().unwrap();

    sign(&hook, signed_command(&project)).await.unwrap();
    let second = read_claims(&project).await.unwrap().unwrap();
    assert_eq!(first.content_hash, second.content_hash);

    let old_token = std::fs::read_to_string(project.join(CLAIMS_FILE_NAME)).unwrap();
    std::fs::write(project.join("index.js"), b"var a = 2;").unwrap();
    sign(&hook, signed_command(&project)).await.unwrap();

    let new_token = std::fs::read_to_string(project.join(CLAIMS_FILE_NAME)).unwrap();
    let third = read_claims(&project).await.unwrap().unwrap();
    assert_ne!(third.content_hash, first.content_hash);
    assert_ne!(new_token, old_token);
}

#[tokio::test]
async fn test_unsigned_release_removes_stale_signature() {
    let work = tempfile::tempdir().unwrap();
    let project = project_dir(work.path());
    let (logger, lines) = capture_logger();
    let hook = SigningHook::new(logger);

    sign(&hook, signed_command(&project)).await.unwrap();
    assert!(project.join(CLAIMS_FILE_NAME).exists());

    let unsigned = ReleaseCommand::new("App", "Staging", &project, "1.0.0");
    let result = sign(&hook, unsigned).await.unwrap();

    assert_eq!(result.package_path, project);
    assert!(!project.join(CLAIMS_FILE_NAME).exists());
    assert!(lines
        .lock()
        .unwrap()
        .iter()
        .any(|l| l.starts_with("Deleting previous release signature at ")));
}

#[tokio::test]
async fn test_unsigned_single_file_is_untouched() {
    let work = tempfile::tempdir().unwrap();
    let bundle = work.path().join("main.jsbundle");
    std::fs::write(&bundle, b"bundle").unwrap();
    let (logger, lines) = capture_logger();

    let command = ReleaseCommand::new("App", "Staging", &bundle, "1.0.0");
    let result = sign(&SigningHook::new(logger), command).await.unwrap();

    assert_eq!(result.package_path, bundle);
    assert!(result.staging.is_none());
    assert!(lines.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_single_file_is_staged_and_cleaned_up() {
    let work = tempfile::tempdir().unwrap();
    let staging_root = tempfile::tempdir().unwrap();
    let bundle = work.path().join("main.jsbundle");
    std::fs::write(&bundle, b"bundle").unwrap();
    let (logger, _) = capture_logger();

    let hook = SigningHook::new(logger).with_staging_root(staging_root.path());
    let result = sign(&hook, signed_command(&bundle)).await.unwrap();

    let package_dir = result.package_path.clone();
    assert_eq!(package_dir.file_name().unwrap(), "AppSync");
    assert!(package_dir.starts_with(staging_root.path()));
    assert_eq!(std::fs::read(package_dir.join("main.jsbundle")).unwrap(), b"bundle");
    assert!(package_dir.join(CLAIMS_FILE_NAME).exists());
    assert!(!work.path().join(CLAIMS_FILE_NAME).exists());

    drop(result);
    assert!(!package_dir.exists());
    assert_eq!(std::fs::read_dir(staging_root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_invalid_key_path_message() {
    let work = tempfile::tempdir().unwrap();
    let project = project_dir(work.path());
    let missing = work.path().join("missing.pem");
    let (logger, _) = capture_logger();

    let mut command = signed_command(&project);
    command.signing_key_path = Some(missing.clone());
    let err = sign(&SigningHook::new(logger), command).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        format!(
            "Could not sign package: The path specified for the signing key (\"{}\") was not valid",
            missing.display()
        )
    );
}

#[tokio::test]
async fn test_invalid_key_contents_message() {
    let work = tempfile::tempdir().unwrap();
    let project = project_dir(work.path());
    let bad_key = work.path().join("bad.pem");
    std::fs::write(&bad_key, "not a key").unwrap();
    let (logger, _) = capture_logger();

    let mut command = signed_command(&project);
    command.signing_key_path = Some(bad_key);
    let err = sign(&SigningHook::new(logger), command).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Could not sign package: The specified signing key file was not valid"
    );
    assert!(!project.join(CLAIMS_FILE_NAME).exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_inaccessible_previous_signature_message() {
    let work = tempfile::tempdir().unwrap();
    let project = project_dir(work.path());
    let signature = project.join(CLAIMS_FILE_NAME);
    // Self-referencing link: opening it fails with ELOOP, even as root
    std::os::unix::fs::symlink(&signature, &signature).unwrap();
    let (logger, lines) = capture_logger();
    let hook = SigningHook::new(logger);

    let expected = format!(
        "Could not delete previous release signature at {}.\nPlease, check your access rights.",
        signature.display()
    );

    let err = sign(&hook, signed_command(&project)).await.unwrap_err();
    assert!(matches!(err, AppError::SigningError(_)));
    assert_eq!(err.to_string(), format!("Could not sign package: {}", expected));

    let unsigned = ReleaseCommand::new("App", "Staging", &project, "1.0.0");
    let err = sign(&hook, unsigned).await.unwrap_err();
    assert_eq!(err.to_string(), expected);

    assert!(std::fs::symlink_metadata(&signature).is_ok());
    assert!(lines.lock().unwrap().is_empty());
}
