//! Diff artifact serialization.

use std::fs;

use logaudit::diff::DiffResult;
use logaudit::output::{DiffSerializer, OutputFormat, SerializeError, DIFF_FILE_NAME};
use tempfile::TempDir;

#[test]
fn test_file_serializer_writes_partition_artifact() {
    let dir = TempDir::new().unwrap();
    let serializer = DiffSerializer::new(OutputFormat::File, dir.path()).unwrap();

    let diff = DiffResult {
        partition: "app-logs-2024.01.05".to_string(),
        missing_lines: vec!["one\n".to_string(), "two\n".to_string()],
    };
    let path = serializer.write(&diff).unwrap();

    assert_eq!(
        path,
        dir.path().join("app-logs-2024.01.05").join(DIFF_FILE_NAME)
    );
    assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
}

#[test]
fn test_empty_diff_still_produces_artifact() {
    let dir = TempDir::new().unwrap();
    let serializer = DiffSerializer::new(OutputFormat::File, dir.path()).unwrap();

    let diff = DiffResult {
        partition: "app-logs-2024.01.05".to_string(),
        missing_lines: vec![],
    };
    let path = serializer.write(&diff).unwrap();

    // The empty artifact is the evidence that the partition was checked.
    assert!(path.exists());
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
}

#[test]
fn test_unsupported_formats_fail_at_construction() {
    let dir = TempDir::new().unwrap();

    assert!(matches!(
        DiffSerializer::new(OutputFormat::Tempfile, dir.path()),
        Err(SerializeError::UnsupportedFormat(OutputFormat::Tempfile))
    ));
    assert!(matches!(
        DiffSerializer::new(OutputFormat::Stdout, dir.path()),
        Err(SerializeError::UnsupportedFormat(OutputFormat::Stdout))
    ));
}

#[test]
fn test_rewrite_replaces_previous_artifact() {
    let dir = TempDir::new().unwrap();
    let serializer = DiffSerializer::new(OutputFormat::File, dir.path()).unwrap();

    let first = DiffResult {
        partition: "p".to_string(),
        missing_lines: vec!["old\n".to_string()],
    };
    serializer.write(&first).unwrap();

    let second = DiffResult {
        partition: "p".to_string(),
        missing_lines: vec!["new\n".to_string()],
    };
    let path = serializer.write(&second).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
}
