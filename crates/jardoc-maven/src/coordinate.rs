use std::fmt;
use std::str::FromStr;

use crate::error::{RepositoryError, Result};
use crate::metadata::MavenMetadata;

const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";
const DEFAULT_PACKAGING: &str = "jar";

/// `groupId:artifactId[:packaging[:classifier]]:version`.
///
/// Empty `packaging`/`classifier` mean "not specified". Coordinates are compared field by
/// field and are used as cache keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub packaging: String,
    pub classifier: String,
    pub version: String,
}

impl Coordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        packaging: impl Into<String>,
        classifier: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            packaging: packaging.into(),
            classifier: classifier.into(),
            version: version.into(),
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let parts: Vec<&str> = input.split(':').collect();
        let coordinate = match parts.as_slice() {
            [group, artifact, version] => Self::new(*group, *artifact, "", "", *version),
            [group, artifact, packaging, version] => {
                Self::new(*group, *artifact, *packaging, "", *version)
            }
            [group, artifact, packaging, classifier, version] => {
                Self::new(*group, *artifact, *packaging, *classifier, *version)
            }
            _ => {
                return Err(RepositoryError::InvalidCoordinate {
                    input: input.to_string(),
                })
            }
        };
        Ok(coordinate)
    }

    /// Same project, different version.
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self.clone()
        }
    }

    pub fn is_snapshot(&self) -> bool {
        self.version.ends_with(SNAPSHOT_SUFFIX)
    }

    /// Repository-relative directory holding this coordinate's files, always with a
    /// trailing slash: `org/example/lib/1.0/`.
    pub fn directory(&self) -> String {
        let mut dir = String::new();
        let segments = self
            .group_id
            .split('.')
            .chain([self.artifact_id.as_str(), self.version.as_str()])
            .filter(|segment| !segment.is_empty());
        for segment in segments {
            dir.push_str(segment);
            dir.push('/');
        }
        dir
    }

    /// File name inside [`Coordinate::directory`].
    ///
    /// Snapshot versions are timestamped, so resolving one needs the directory's
    /// `maven-metadata.xml`.
    pub fn file_name(&self, metadata: Option<&MavenMetadata>) -> Result<String> {
        let version = if self.is_snapshot() {
            let snapshot = metadata
                .and_then(|metadata| metadata.snapshot.as_ref())
                .ok_or_else(|| RepositoryError::MissingSnapshotMetadata {
                    coordinate: self.to_string(),
                })?;
            self.version.replacen(
                SNAPSHOT_SUFFIX,
                &format!("-{}-{}", snapshot.timestamp, snapshot.build_number),
                1,
            )
        } else {
            self.version.clone()
        };

        let packaging = if self.packaging.is_empty() {
            DEFAULT_PACKAGING
        } else {
            &self.packaging
        };
        let classifier = if self.classifier.is_empty() {
            String::new()
        } else {
            format!("-{}", self.classifier)
        };

        Ok(format!(
            "{}-{version}{classifier}.{packaging}",
            self.artifact_id
        ))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if !self.packaging.is_empty() {
            write!(f, ":{}", self.packaging)?;
            if !self.classifier.is_empty() {
                write!(f, ":{}", self.classifier)?;
            }
        }
        write!(f, ":{}", self.version)
    }
}

impl FromStr for Coordinate {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
