/// The subset of a `maven-metadata.xml` document jardoc cares about.
///
/// Project-level metadata (`<group>/<artifact>/maven-metadata.xml`) carries the version
/// list; version-level metadata of a snapshot carries the timestamp and build number of
/// the newest upload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MavenMetadata {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub snapshot: Option<SnapshotVersion>,
    pub versions: Vec<String>,
    pub last_updated: Option<String>,
    pub release: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotVersion {
    pub timestamp: String,
    pub build_number: u32,
}

impl MavenMetadata {
    pub fn parse(xml: &str) -> Result<Self, roxmltree::Error> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();

        let mut metadata = MavenMetadata {
            group_id: child_text(&root, "groupId"),
            artifact_id: child_text(&root, "artifactId"),
            version: child_text(&root, "version"),
            ..MavenMetadata::default()
        };

        let Some(versioning) = child_element(&root, "versioning") else {
            return Ok(metadata);
        };

        metadata.snapshot = child_element(&versioning, "snapshot").and_then(|snapshot| {
            Some(SnapshotVersion {
                timestamp: child_text(&snapshot, "timestamp")?,
                build_number: child_text(&snapshot, "buildNumber")?.parse().ok()?,
            })
        });
        if let Some(versions) = child_element(&versioning, "versions") {
            metadata.versions = versions
                .children()
                .filter(|n| n.is_element() && n.tag_name().name() == "version")
                .filter_map(|n| n.text())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();
        }
        metadata.last_updated = child_text(&versioning, "lastUpdated");
        metadata.release = child_text(&versioning, "release");

        Ok(metadata)
    }
}

fn child_element<'a>(
    node: &'a roxmltree::Node<'a, 'a>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child_text(node: &roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    child_element(node, name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_snapshot_metadata() {
        let xml = r#"<metadata>
<groupId>org.spongepowered</groupId>
<artifactId>spongeapi</artifactId>
<version>2.1-SNAPSHOT</version>
<versioning>
<snapshot>
<timestamp>20160101.061445</timestamp>
<buildNumber>272</buildNumber>
</snapshot>
<lastUpdated>20160101061445</lastUpdated>
</versioning>
</metadata>"#;

        let metadata = MavenMetadata::parse(xml).unwrap();
        assert_eq!(metadata.version.as_deref(), Some("2.1-SNAPSHOT"));
        assert_eq!(
            metadata.snapshot,
            Some(SnapshotVersion {
                timestamp: "20160101.061445".into(),
                build_number: 272,
            })
        );
        assert_eq!(metadata.last_updated.as_deref(), Some("20160101061445"));
        assert!(metadata.versions.is_empty());
    }

    #[test]
    fn parses_project_version_list_in_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>org.spongepowered</groupId>
  <artifactId>spongeapi</artifactId>
  <versioning>
    <release>3.0.0</release>
    <versions>
      <version>1.0</version>
      <version>2.1-SNAPSHOT</version>
      <version>3.0.0</version>
    </versions>
  </versioning>
</metadata>"#;

        let metadata = MavenMetadata::parse(xml).unwrap();
        assert_eq!(metadata.versions, vec!["1.0", "2.1-SNAPSHOT", "3.0.0"]);
        assert_eq!(metadata.release.as_deref(), Some("3.0.0"));
        assert_eq!(metadata.snapshot, None);
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(MavenMetadata::parse("<metadata><versioning>").is_err());
    }
}
