//! Partition-to-source-file mapping.
//!
//! Every file in the canonical logs directory mirrors exactly one partition;
//! the partition name is derived from the file's first log line. Files whose
//! first line does not match the expected log shape are skipped with a
//! reported error; they are never processed under an undefined name.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

/// Partition name -> source log file path.
///
/// Built once per run. First file encountered for a derived name wins;
/// later files with the same name are dropped.
pub type PartitionPathMap = BTreeMap<String, PathBuf>;

/// Log-line shape a partition name is derived from:
/// `YYYY-MM-DD ... | [system] entity`.
const LINE_PATTERN: &str =
    r"^([12]\d{3})-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01]).*\|\s+\[(\w+)\]\s+(\w+)";

/// Errors that can occur while building the partition map.
#[derive(Debug, thiserror::Error)]
pub enum PathsError {
    /// The logs directory itself could not be traversed.
    #[error("failed to read logs directory {path}: {source}")]
    LogsDirIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A source file excluded from the map, with the reason.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    /// Path of the skipped file.
    pub path: PathBuf,
    /// Why it was skipped.
    pub reason: String,
}

/// Result of a partition-map build: the map plus every skipped file.
#[derive(Debug, Default)]
pub struct MapBuildReport {
    /// Partition name -> source file, first file wins.
    pub map: PartitionPathMap,
    /// Files excluded from the map, each with a reported reason.
    pub skipped: Vec<SkippedFile>,
}

/// Derives partition names from log lines.
pub struct PartitionNamer {
    pattern: Regex,
}

impl PartitionNamer {
    /// Compile the line pattern once.
    #[must_use]
    pub fn new() -> Self {
        Self {
            // The pattern is a checked constant.
            pattern: Regex::new(LINE_PATTERN).expect("invalid partition line pattern"),
        }
    }

    /// Derive `{system}-{entity}-{year}.{month}.{day}` from a log line,
    /// or `None` if the line does not match the expected shape.
    #[must_use]
    pub fn name_for_line(&self, line: &str) -> Option<String> {
        let captures = self.pattern.captures(line)?;
        let (year, month, day) = (&captures[1], &captures[2], &captures[3]);
        let (system, entity) = (&captures[4], &captures[5]);
        Some(format!("{system}-{entity}-{year}.{month}.{day}"))
    }
}

impl Default for PartitionNamer {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the partition map from the top level of `logs_dir`.
///
/// Non-regular entries and files whose partition name cannot be derived are
/// reported in the returned [`MapBuildReport`] and logged; they never abort
/// the build.
///
/// # Errors
///
/// Returns `PathsError::LogsDirIo` only if the directory itself cannot be
/// traversed.
pub fn build_partition_map(logs_dir: &Path) -> Result<MapBuildReport, PathsError> {
    let namer = PartitionNamer::new();
    let mut report = MapBuildReport::default();

    for entry in WalkDir::new(logs_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| PathsError::LogsDirIo {
            path: logs_dir.to_path_buf(),
            source: e
                .into_io_error()
                .unwrap_or_else(|| io::Error::other("walk error")),
        })?;

        let path = entry.path();
        if !entry.file_type().is_file() {
            log::error!("Entry is not a regular file: {}", path.display());
            report.skipped.push(SkippedFile {
                path: path.to_path_buf(),
                reason: "not a regular file".to_string(),
            });
            continue;
        }

        let first_line = match read_first_line(path) {
            Ok(line) => line,
            Err(e) => {
                log::error!("Failed to read first line of {}: {}", path.display(), e);
                report.skipped.push(SkippedFile {
                    path: path.to_path_buf(),
                    reason: format!("unreadable: {e}"),
                });
                continue;
            }
        };

        let Some(partition) = namer.name_for_line(&first_line) else {
            log::error!(
                "First line of {} does not match the log shape, skipping file",
                path.display()
            );
            report.skipped.push(SkippedFile {
                path: path.to_path_buf(),
                reason: "first line does not match the log shape".to_string(),
            });
            continue;
        };

        // First file wins on a name collision.
        if let std::collections::btree_map::Entry::Vacant(slot) = report.map.entry(partition) {
            slot.insert(path.to_path_buf());
        } else {
            log::debug!(
                "Partition already mapped, dropping later file {}",
                path.display()
            );
        }
    }

    log::info!(
        "Partition map built: {} partitions, {} skipped files",
        report.map.len(),
        report.skipped.len()
    );

    Ok(report)
}

fn read_first_line(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line)?;
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MATCHING_LINE: &str =
        "2024-01-05 12:00:00 | [app] logs | INFO | something happened\n";

    #[test]
    fn test_name_for_matching_line() {
        let namer = PartitionNamer::new();
        assert_eq!(
            namer.name_for_line(MATCHING_LINE).as_deref(),
            Some("app-logs-2024.01.05")
        );
    }

    #[test]
    fn test_name_for_non_matching_line() {
        let namer = PartitionNamer::new();
        assert_eq!(namer.name_for_line("not a log line"), None);
        assert_eq!(namer.name_for_line(""), None);
    }

    #[test]
    fn test_name_rejects_invalid_dates() {
        let namer = PartitionNamer::new();
        assert_eq!(
            namer.name_for_line("2024-13-05 12:00:00 | [app] logs |"),
            None
        );
        assert_eq!(
            namer.name_for_line("2024-01-32 12:00:00 | [app] logs |"),
            None
        );
    }

    #[test]
    fn test_build_map_first_file_wins() {
        let dir = TempDir::new().unwrap();
        // Sorted traversal: a.log is seen before b.log.
        fs::write(dir.path().join("a.log"), MATCHING_LINE).unwrap();
        fs::write(dir.path().join("b.log"), MATCHING_LINE).unwrap();

        let report = build_partition_map(dir.path()).unwrap();
        assert_eq!(report.map.len(), 1);
        assert_eq!(
            report.map["app-logs-2024.01.05"],
            dir.path().join("a.log")
        );
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_build_map_skips_non_matching_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("good.log"), MATCHING_LINE).unwrap();
        fs::write(dir.path().join("junk.log"), "garbage first line\n").unwrap();

        let report = build_partition_map(dir.path()).unwrap();
        assert_eq!(report.map.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].path.ends_with("junk.log"));
    }

    #[test]
    fn test_build_map_skips_subdirectories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("good.log"), MATCHING_LINE).unwrap();

        let report = build_partition_map(dir.path()).unwrap();
        assert_eq!(report.map.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, "not a regular file");
    }

    #[test]
    fn test_build_map_empty_dir() {
        let dir = TempDir::new().unwrap();
        let report = build_partition_map(dir.path()).unwrap();
        assert!(report.map.is_empty());
        assert!(report.skipped.is_empty());
    }
}
