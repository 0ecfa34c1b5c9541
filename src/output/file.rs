//! File-based diff artifact writer.
//!
//! Writes each diff result as `<output_dir>/<partition>/store_to_source.diff`.
//! The per-partition directory is created on demand; one that already exists
//! (e.g. from a previous run) is a logged warning, not an error.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::diff::DiffResult;

use super::{SerializeError, DIFF_FILE_NAME};

/// Serializes diff results into per-partition files.
pub struct FileSerializer {
    output_dir: PathBuf,
}

impl FileSerializer {
    /// Create a serializer rooted at `output_dir`.
    #[must_use]
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Write one diff artifact, returning its path.
    ///
    /// An empty diff still produces an (empty) artifact: a partition that
    /// matched its source is recorded, not omitted.
    ///
    /// # Errors
    ///
    /// Returns `SerializeError::Io` if the directory or file cannot be
    /// created or written.
    pub fn write(&self, diff: &DiffResult) -> Result<PathBuf, SerializeError> {
        let partition_dir = self.output_dir.join(&diff.partition);
        self.ensure_partition_dir(&partition_dir)?;

        let artifact_path = partition_dir.join(DIFF_FILE_NAME);
        let mut file = fs::File::create(&artifact_path).map_err(|e| SerializeError::Io {
            path: artifact_path.clone(),
            source: e,
        })?;

        for line in &diff.missing_lines {
            file.write_all(line.as_bytes())
                .map_err(|e| SerializeError::Io {
                    path: artifact_path.clone(),
                    source: e,
                })?;
        }

        log::debug!(
            "Wrote {} missing lines for '{}' to {}",
            diff.missing_lines.len(),
            diff.partition,
            artifact_path.display()
        );

        Ok(artifact_path)
    }

    fn ensure_partition_dir(&self, dir: &Path) -> Result<(), SerializeError> {
        if dir.is_dir() {
            log::warn!(
                "Output directory {} already exists, overwriting artifact",
                dir.display()
            );
            return Ok(());
        }

        fs::create_dir_all(dir).map_err(|e| SerializeError::Io {
            path: dir.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn diff(partition: &str, lines: &[&str]) -> DiffResult {
        DiffResult {
            partition: partition.to_string(),
            missing_lines: lines.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_write_creates_partition_dir_and_artifact() {
        let dir = TempDir::new().unwrap();
        let serializer = FileSerializer::new(dir.path());

        let path = serializer
            .write(&diff("app-logs-2024.01.01", &["x\n", "y\n"]))
            .unwrap();

        assert_eq!(
            path,
            dir.path().join("app-logs-2024.01.01").join(DIFF_FILE_NAME)
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "x\ny\n");
    }

    #[test]
    fn test_write_empty_diff_produces_empty_artifact() {
        let dir = TempDir::new().unwrap();
        let serializer = FileSerializer::new(dir.path());

        let path = serializer.write(&diff("p", &[])).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_write_existing_dir_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("p")).unwrap();
        let serializer = FileSerializer::new(dir.path());

        let path = serializer.write(&diff("p", &["a\n"])).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\n");
    }

    #[test]
    fn test_rewrite_replaces_artifact() {
        let dir = TempDir::new().unwrap();
        let serializer = FileSerializer::new(dir.path());

        serializer.write(&diff("p", &["old\n"])).unwrap();
        let path = serializer.write(&diff("p", &["new\n"])).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    }
}
