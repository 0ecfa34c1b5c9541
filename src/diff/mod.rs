//! Integrity diffing of store partitions against canonical log files.
//!
//! This module provides functionality for:
//! - Mapping source log files to the partitions they mirror ([`paths`])
//! - Computing the set of canonical lines missing from a partition
//!   ([`engine`])
//! - Running per-partition diffs over a bounded worker pool ([`pool`])

pub mod engine;
pub mod paths;
pub mod pool;

use serde::Serialize;

pub use engine::{DiffEngine, EngineError};
pub use paths::{build_partition_map, MapBuildReport, PartitionNamer, PartitionPathMap};
pub use pool::{DiffReport, DiffWorkerPool, PartitionFailure, PoolConfig};

/// The lines of one partition's source log file that were not found in the
/// store.
///
/// An empty `missing_lines` is a valid, meaningful result: the partition is
/// consistent with its source. Iteration order of the lines is unspecified;
/// callers needing determinism sort explicitly.
#[derive(Debug, Clone, Serialize)]
pub struct DiffResult {
    /// Partition the diff was computed for.
    pub partition: String,
    /// Canonical lines absent from the store, newline-terminated.
    pub missing_lines: Vec<String>,
}

impl DiffResult {
    /// Number of missing lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.missing_lines.len()
    }

    /// Whether the partition matched its source exactly.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.missing_lines.is_empty()
    }

    /// The missing lines in sorted order, for deterministic output.
    #[must_use]
    pub fn sorted_lines(&self) -> Vec<String> {
        let mut lines = self.missing_lines.clone();
        lines.sort();
        lines
    }
}
