//! Duplicate detection and pruning.
//!
//! This module provides functionality for:
//! - Content fingerprinting over the configured hash-key fields
//! - Per-partition duplicate grouping with first-seen survivor retention
//! - Independent per-id pruning with explicit partial-failure reporting

pub mod detector;
pub mod fingerprint;

pub use detector::{
    dedup_partition, DedupStats, DuplicateDetector, PartialGroupFailure, ResolvedGroup,
};
pub use fingerprint::{fingerprint_document, fingerprint_hex, Fingerprint};

use crate::store::{ScanError, StoreError};

/// Errors that can occur during a dedup pass.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DedupError {
    /// A hash-key field was absent on a document. Fatal for that document;
    /// never silently treated as an empty value.
    #[error("document '{doc_id}': hash-key field '{field}' is missing")]
    MissingField { doc_id: String, field: String },

    /// The pass was interrupted by the operator abort signal.
    #[error("dedup pass interrupted by user")]
    Interrupted,

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The partition scan failed or was truncated.
    #[error(transparent)]
    Scan(#[from] ScanError),
}
