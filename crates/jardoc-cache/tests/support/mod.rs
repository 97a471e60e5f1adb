use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use jardoc_maven::{Artifact, Coordinate, Repository, RepositoryError};
use parking_lot::Mutex;
use zip::write::FileOptions;

pub fn project() -> Coordinate {
    Coordinate::new("org.example", "api", "jar", "javadoc", "")
}

pub fn version(v: &str) -> Coordinate {
    project().with_version(v)
}

pub fn javadoc_zip() -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default();
    zip.start_file("index.html", options).unwrap();
    zip.write_all(b"<html>docs</html>").unwrap();
    zip.start_file("org/example/Api.html", options).unwrap();
    zip.write_all(b"<html>Api</html>").unwrap();
    zip.finish().unwrap().into_inner()
}

/// In-memory repository that serves the same archive for every coordinate.
pub struct FakeRepository {
    pub archive: Mutex<Vec<u8>>,
    pub versions: Mutex<Vec<String>>,
    pub missing: Mutex<HashSet<String>>,
    pub fail_listing: AtomicBool,
    pub fetches: AtomicUsize,
    pub listings: AtomicUsize,
}

impl FakeRepository {
    pub fn new(versions: &[&str]) -> Self {
        Self {
            archive: Mutex::new(javadoc_zip()),
            versions: Mutex::new(versions.iter().map(|v| v.to_string()).collect()),
            missing: Mutex::new(HashSet::new()),
            fail_listing: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
            listings: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Repository for FakeRepository {
    async fn resolve(&self, coordinate: &Coordinate) -> Result<Artifact, RepositoryError> {
        let url = format!(
            "http://repo.invalid/{}{}",
            coordinate.directory(),
            coordinate.artifact_id
        );
        if self.missing.lock().contains(&coordinate.version) {
            return Err(RepositoryError::NotFound { url });
        }
        Ok(Artifact {
            coordinate: coordinate.clone(),
            url: url::Url::parse(&url).unwrap(),
        })
    }

    async fn fetch(&self, _artifact: &Artifact) -> Result<Vec<u8>, RepositoryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.archive.lock().clone())
    }

    async fn list_versions(
        &self,
        project: &Coordinate,
    ) -> Result<Vec<Coordinate>, RepositoryError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(RepositoryError::BadStatus {
                url: "http://repo.invalid/maven-metadata.xml".into(),
                status: 502,
            });
        }
        Ok(self
            .versions
            .lock()
            .iter()
            .map(|v| project.with_version(v.as_str()))
            .collect())
    }
}
