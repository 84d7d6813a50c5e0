//! Manifest and archive tests

use std::io::Read;

use appsync::package::archive::{package_to_archive, write_archive};
use appsync::package::claims::CLAIMS_FILE_NAME;
use appsync::package::manifest::build_manifest;

use crate::support::{project_dir, zip_entries};

#[tokio::test]
async fn test_project_dir_archive_has_two_entries() {
    let work = tempfile::tempdir().unwrap();
    let project = project_dir(work.path());
    let out = tempfile::tempdir().unwrap();

    let archive = package_to_archive(&project, out.path()).await.unwrap();

    assert_eq!(
        zip_entries(&archive),
        vec!["ProjectDir/assets/logo.png", "ProjectDir/index.js"]
    );
    assert!(!zip_entries(&archive).iter().any(|e| e.ends_with(CLAIMS_FILE_NAME)));
}

#[tokio::test]
async fn test_archive_round_trip_preserves_bytes() {
    let work = tempfile::tempdir().unwrap();
    let project = project_dir(work.path());
    std::fs::create_dir_all(project.join("a").join("b")).unwrap();
    std::fs::write(project.join("a").join("b").join("deep.txt"), b"deep content").unwrap();
    std::fs::write(project.join("empty.txt"), b"").unwrap();

    let manifest = build_manifest(&project).await.unwrap();
    let out = tempfile::tempdir().unwrap();
    let archive = write_archive(&manifest, out.path()).await.unwrap();

    let mut zip = zip::ZipArchive::new(std::fs::File::open(&archive).unwrap()).unwrap();
    assert_eq!(zip.len(), manifest.len());

    for entry in manifest.entries() {
        let mut member = zip.by_name(&entry.archive_path).unwrap();
        let mut contents = Vec::new();
        member.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, std::fs::read(&entry.source_path).unwrap());
    }
}

#[tokio::test]
async fn test_manifest_is_sorted_and_rooted() {
    let work = tempfile::tempdir().unwrap();
    let project = project_dir(work.path());
    std::fs::write(project.join("a.js"), b"a").unwrap();

    let manifest = build_manifest(&project).await.unwrap();
    let paths: Vec<&str> = manifest.archive_paths().collect();
    assert_eq!(
        paths,
        vec!["ProjectDir/a.js", "ProjectDir/assets/logo.png", "ProjectDir/index.js"]
    );
}

#[tokio::test]
async fn test_missing_package_fails() {
    let work = tempfile::tempdir().unwrap();
    assert!(build_manifest(&work.path().join("missing")).await.is_err());
}
