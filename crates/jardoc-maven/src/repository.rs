use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::coordinate::Coordinate;
use crate::error::{RepositoryError, Result};
use crate::metadata::MavenMetadata;

const METADATA_FILE: &str = "maven-metadata.xml";

/// A coordinate resolved to the concrete location of its file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub coordinate: Coordinate,
    pub url: Url,
}

/// Source of artifacts and version listings.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Work out where `coordinate` lives. Snapshot versions are pinned to their newest
    /// timestamped upload.
    async fn resolve(&self, coordinate: &Coordinate) -> Result<Artifact>;

    /// Download the artifact's bytes.
    async fn fetch(&self, artifact: &Artifact) -> Result<Vec<u8>>;

    /// Every published version of `project` (its version field is ignored), oldest first.
    async fn list_versions(&self, project: &Coordinate) -> Result<Vec<Coordinate>>;
}

#[derive(Clone, Debug)]
pub struct RemoteRepositoryOptions {
    pub allow_snapshots: bool,
    pub request_timeout: Duration,
    pub max_artifact_bytes: u64,
}

impl Default for RemoteRepositoryOptions {
    fn default() -> Self {
        Self {
            allow_snapshots: true,
            request_timeout: Duration::from_secs(60),
            max_artifact_bytes: 256 * 1024 * 1024,
        }
    }
}

/// A Maven repository reachable over HTTP(S).
#[derive(Clone, Debug)]
pub struct RemoteRepository {
    base_url: Url,
    options: RemoteRepositoryOptions,
    client: reqwest::Client,
}

impl RemoteRepository {
    pub fn new(base_url: Url, options: RemoteRepositoryOptions) -> Result<Self> {
        // `Url::join` replaces the last segment unless the base ends in a slash.
        let base_str = base_url.as_str().trim_end_matches('/');
        let base_url = Url::parse(&format!("{base_str}/"))?;

        let client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .user_agent(concat!("jardoc/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url,
            options,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn directory_url(&self, coordinate: &Coordinate) -> Result<Url> {
        Ok(self.base_url.join(&coordinate.directory())?)
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(RepositoryError::UnsupportedScheme {
                url: url.to_string(),
            });
        }

        tracing::debug!(target = "jardoc.maven", url = %url, "GET");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RepositoryError::NotFound {
                url: url.to_string(),
            });
        }
        if status != reqwest::StatusCode::OK {
            return Err(RepositoryError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn metadata(&self, directory: &Url) -> Result<MavenMetadata> {
        let url = directory.join(METADATA_FILE)?;
        let body = self.get(&url).await?.text().await?;
        MavenMetadata::parse(&body).map_err(|source| RepositoryError::Xml {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl Repository for RemoteRepository {
    async fn resolve(&self, coordinate: &Coordinate) -> Result<Artifact> {
        if coordinate.is_snapshot() && !self.options.allow_snapshots {
            return Err(RepositoryError::SnapshotsDisallowed {
                coordinate: coordinate.to_string(),
            });
        }

        let directory = self.directory_url(coordinate)?;
        let metadata = if coordinate.is_snapshot() {
            Some(self.metadata(&directory).await?)
        } else {
            None
        };
        let file_name = coordinate.file_name(metadata.as_ref())?;

        Ok(Artifact {
            coordinate: coordinate.clone(),
            url: directory.join(&file_name)?,
        })
    }

    async fn fetch(&self, artifact: &Artifact) -> Result<Vec<u8>> {
        let limit = self.options.max_artifact_bytes;
        let too_large = || RepositoryError::TooLarge {
            url: artifact.url.to_string(),
            limit,
        };

        let mut response = self.get(&artifact.url).await?;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(too_large());
        }

        let mut bytes = Vec::with_capacity(
            response
                .content_length()
                .and_then(|len| usize::try_from(len).ok())
                .unwrap_or(0),
        );
        while let Some(chunk) = response.chunk().await? {
            if (bytes.len() + chunk.len()) as u64 > limit {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }

        tracing::debug!(
            target = "jardoc.maven",
            url = %artifact.url,
            bytes = bytes.len(),
            "fetched artifact"
        );
        Ok(bytes)
    }

    async fn list_versions(&self, project: &Coordinate) -> Result<Vec<Coordinate>> {
        let project = project.with_version("");
        let directory = self.directory_url(&project)?;
        let metadata = self.metadata(&directory).await?;

        Ok(metadata
            .versions
            .into_iter()
            .map(|version| project.with_version(version))
            .collect())
    }
}
