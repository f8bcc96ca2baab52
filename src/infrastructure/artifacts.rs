//! Raw result artifact persistence.
//!
//! One HTML document per accepted partition, named deterministically from
//! the partition key so a duplicate fetch overwrites the same file instead
//! of forking a second copy. Downstream extraction treats these files as
//! immutable input.

use std::path::{Path, PathBuf};

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tokio::fs;
use tracing::debug;

use crate::domain::partition::PartitionKey;
use crate::error::{HarvestError, Result};

const SEGMENT_SEPARATOR: &str = "___";

pub struct ArtifactWriter {
    download_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
        }
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|source| HarvestError::Artifact {
                path: self.download_dir.display().to_string(),
                source,
            })
    }

    pub fn path_for(&self, key: &PartitionKey) -> PathBuf {
        self.download_dir.join(artifact_filename(key))
    }

    /// Writes the partition's raw HTML. Overwrites any previous fetch of
    /// the same partition.
    pub async fn persist(&self, key: &PartitionKey, html: &str) -> Result<PathBuf> {
        let path = self.path_for(key);
        fs::write(&path, html)
            .await
            .map_err(|source| HarvestError::Artifact {
                path: path.display().to_string(),
                source,
            })?;
        debug!("Persisted artifact {} ({} bytes)", path.display(), html.len());
        Ok(path)
    }
}

/// `<encodedUniName>___<uniId>[___<encodedValueName>___<valueId>]*___<year>.html`
pub fn artifact_filename(key: &PartitionKey) -> String {
    let mut segments = vec![
        encode_segment(&key.university.name),
        key.university.id.clone(),
    ];
    for (_, value) in &key.refinements {
        segments.push(encode_segment(&value.name));
        segments.push(value.id.clone());
    }
    segments.push(key.year.clone());
    format!("{}.html", segments.join(SEGMENT_SEPARATOR))
}

fn encode_segment(name: &str) -> String {
    utf8_percent_encode(name, NON_ALPHANUMERIC).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dimensions::{DimensionValue, RefinementKind};

    #[test]
    fn filenames_are_deterministic_and_filesystem_safe() {
        let key = PartitionKey::new(DimensionValue::new("10", "Örnek Üniversitesi"), "2020")
            .refine(
                RefinementKind::Institute,
                DimensionValue::new("5", "Fen Bilimleri Enstitüsü"),
            );
        let name = artifact_filename(&key);
        assert_eq!(name, artifact_filename(&key));
        assert!(name.ends_with("___2020.html"));
        assert!(!name.contains(' '));
        assert!(!name.contains('/'));
    }

    #[test]
    fn distinct_partitions_get_distinct_files() {
        let a = PartitionKey::new(DimensionValue::new("10", "Uni"), "2020");
        let b = PartitionKey::new(DimensionValue::new("10", "Uni"), "2021");
        assert_ne!(artifact_filename(&a), artifact_filename(&b));
    }

    #[tokio::test]
    async fn persist_overwrites_the_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let key = PartitionKey::new(DimensionValue::new("10", "Uni"), "2020");

        let first = writer.persist(&key, "<html>v1</html>").await.unwrap();
        let second = writer.persist(&key, "<html>v2</html>").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(second).unwrap(), "<html>v2</html>");
    }
}
