//! Per-partition diff computation.
//!
//! The canonical set is the unique, newline-normalized lines of a partition's
//! source log file; the store set is the unique reconstructed message lines of
//! every document in that partition. The diff is `canonical − store`, computed
//! by hash-set membership: linear in the combined size, never a nested
//! comparison.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::store::{CursorScanner, ScanError, ScanOptions, StoreClient};

use super::DiffResult;

/// Errors that can occur while diffing one partition.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The source log file could not be read.
    #[error("failed to read source log {path}: {source}")]
    SourceIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A document lacks the configured message field, so its store line
    /// cannot be reconstructed. Reported with the document id.
    #[error("document '{doc_id}' has no '{field}' field")]
    MissingMessageField { doc_id: String, field: String },

    /// The diff was interrupted by the operator abort signal.
    #[error("diff interrupted by user")]
    Interrupted,

    /// The partition scan failed or was truncated.
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Computes `canonical − store` for one partition at a time.
///
/// The engine is stateless across invocations and may be shared by worker
/// threads; all per-partition state lives on the stack of `diff_partition`.
pub struct DiffEngine<'a> {
    client: &'a dyn StoreClient,
    message_field: &'a str,
    options: ScanOptions,
    abort: Option<Arc<AtomicBool>>,
}

impl<'a> DiffEngine<'a> {
    /// Create an engine reconstructing store lines from `message_field`.
    #[must_use]
    pub fn new(client: &'a dyn StoreClient, message_field: &'a str, options: ScanOptions) -> Self {
        Self {
            client,
            message_field,
            options,
            abort: None,
        }
    }

    /// Attach an abort flag checked before every blocking scan advance.
    #[must_use]
    pub fn with_abort_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abort = Some(flag);
        self
    }

    fn is_aborted(&self) -> bool {
        self.abort
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Diff `partition` against its source log file.
    ///
    /// An empty diff is returned as a normal result; the absence of
    /// difference is itself meaningful.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the source file cannot be read, the scan
    /// fails or is truncated, a document cannot be reconstructed, or the
    /// abort flag is raised mid-scan.
    pub fn diff_partition(
        &self,
        partition: &str,
        source: &Path,
    ) -> Result<DiffResult, EngineError> {
        let canonical = self.read_canonical_lines(source)?;
        let store = self.collect_store_lines(partition)?;

        let missing_lines: Vec<String> = canonical
            .into_iter()
            .filter(|line| !store.contains(line))
            .collect();

        log::debug!(
            "Partition '{}': {} canonical-only lines ({} store lines)",
            partition,
            missing_lines.len(),
            store.len()
        );

        Ok(DiffResult {
            partition: partition.to_string(),
            missing_lines,
        })
    }

    /// Unique newline-normalized lines of the source log file.
    fn read_canonical_lines(&self, source: &Path) -> Result<HashSet<String>, EngineError> {
        let content = fs::read_to_string(source).map_err(|e| EngineError::SourceIo {
            path: source.to_path_buf(),
            source: e,
        })?;

        Ok(content
            .split_inclusive('\n')
            .map(normalize_line)
            .collect())
    }

    /// Unique reconstructed message lines of every document in `partition`.
    fn collect_store_lines(&self, partition: &str) -> Result<HashSet<String>, EngineError> {
        let mut scanner = CursorScanner::open(self.client, partition, self.options.clone())?;
        let mut lines = HashSet::new();

        loop {
            if self.is_aborted() {
                return Err(EngineError::Interrupted);
            }

            let batch = scanner.advance()?;
            if batch.done {
                return Ok(lines);
            }

            for doc in &batch.documents {
                let message = doc.field_text(self.message_field).ok_or_else(|| {
                    EngineError::MissingMessageField {
                        doc_id: doc.id.clone(),
                        field: self.message_field.to_string(),
                    }
                })?;
                lines.insert(normalize_line(&message));
            }
        }
    }
}

/// Normalize a line to LF with exactly one trailing newline.
///
/// DOS line endings collapse to `\n`; a final line without a terminator
/// gets one, so membership compares line text rather than trailing bytes.
fn normalize_line(line: &str) -> String {
    let trimmed = line.trim_end_matches('\n').trim_end_matches('\r');
    format!("{trimmed}\n")
}
