//! Per-partition duplicate detection and pruning.
//!
//! # Overview
//!
//! The [`DuplicateDetector`] accumulates duplicate groups for exactly one
//! partition, sequentially:
//!
//! 1. `ingest` every scanned batch, fingerprinting each document
//! 2. `resolve` groups into a survivor (first-seen) and condemned ids
//! 3. `delete_condemned` prunes the condemned ids independently
//!
//! Group state is scoped to one partition. A detector must be `reset` (or a
//! fresh one constructed) before the next partition; groups never leak
//! across partitions, and concurrently processed partitions never share a
//! detector instance.
//!
//! # Deletion semantics
//!
//! Deletions within a group are independent: there is no atomicity and no
//! rollback. A not-found response is recovered (the id was already absent).
//! Any other per-id failure leaves the group partially pruned; that state is
//! recorded as a [`PartialGroupFailure`] and reported after the pass, never
//! swallowed.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::store::{CursorScanner, DeleteOutcome, Document, ScanOptions, StoreClient, StoreError};

use super::fingerprint::{fingerprint_document, fingerprint_hex, Fingerprint};
use super::DedupError;

/// A resolved duplicate group: one survivor, the rest condemned.
#[derive(Debug, Clone)]
pub struct ResolvedGroup {
    /// Content fingerprint shared by every member.
    pub fingerprint: Fingerprint,
    /// First-seen document id; never deleted.
    pub survivor: String,
    /// Remaining member ids, in scan order.
    pub condemned: Vec<String>,
}

/// A duplicate group left in a known partial state after deletion failures.
#[derive(Debug, Clone)]
pub struct PartialGroupFailure {
    /// Hex fingerprint of the affected group.
    pub fingerprint: String,
    /// Ids deleted before and after the failures.
    pub deleted: usize,
    /// Per-id failures: (document id, error description).
    pub failures: Vec<(String, String)>,
}

impl fmt::Display for PartialGroupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "group {}: {} deleted, {} failed ({})",
            self.fingerprint,
            self.deleted,
            self.failures.len(),
            self.failures
                .iter()
                .map(|(id, err)| format!("{id}: {err}"))
                .collect::<Vec<_>>()
                .join("; ")
        )
    }
}

/// Statistics from one partition's dedup pass.
#[derive(Debug, Clone, Default)]
pub struct DedupStats {
    /// Duplicate groups with more than one member.
    pub duplicate_groups: usize,
    /// Condemned ids across all groups.
    pub condemned: usize,
    /// Ids actually deleted.
    pub deleted: usize,
    /// Ids that were already absent (recovered not-found responses).
    pub already_absent: usize,
    /// Groups left partially pruned.
    pub partial_failures: Vec<PartialGroupFailure>,
}

impl DedupStats {
    /// Whether every condemned id was handled without failure.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.partial_failures.is_empty()
    }

    /// Fold another partition's stats into this aggregate.
    pub fn merge(&mut self, other: DedupStats) {
        self.duplicate_groups += other.duplicate_groups;
        self.condemned += other.condemned;
        self.deleted += other.deleted;
        self.already_absent += other.already_absent;
        self.partial_failures.extend(other.partial_failures);
    }
}

/// Groups one partition's documents by content fingerprint and prunes
/// everything but the first-seen member of each group.
pub struct DuplicateDetector<'a> {
    client: &'a dyn StoreClient,
    partition: String,
    hash_keys: &'a [String],
    /// fingerprint -> member ids in first-seen scan order.
    groups: HashMap<Fingerprint, Vec<String>>,
}

impl<'a> DuplicateDetector<'a> {
    /// Create a detector for one partition.
    #[must_use]
    pub fn new(
        client: &'a dyn StoreClient,
        partition: impl Into<String>,
        hash_keys: &'a [String],
    ) -> Self {
        Self {
            client,
            partition: partition.into(),
            hash_keys,
            groups: HashMap::new(),
        }
    }

    /// The partition this detector is scoped to.
    #[must_use]
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Number of fingerprints seen so far (including singletons).
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Fingerprint a batch of documents and append each id to its group.
    ///
    /// # Errors
    ///
    /// Returns `DedupError::MissingField` if any document lacks a hash-key
    /// field; the batch is not silently partially ingested beyond that
    /// document.
    pub fn ingest(&mut self, batch: &[Document]) -> Result<(), DedupError> {
        for doc in batch {
            let fingerprint = fingerprint_document(doc, self.hash_keys)?;
            self.groups
                .entry(fingerprint)
                .or_default()
                .push(doc.id.clone());
        }
        Ok(())
    }

    /// Resolve accumulated groups into survivor/condemned splits.
    ///
    /// Groups of size 1 are never acted on and do not appear in the result.
    /// The first-seen id of each group is the survivor.
    #[must_use]
    pub fn resolve(&self) -> Vec<ResolvedGroup> {
        self.groups
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(fingerprint, ids)| ResolvedGroup {
                fingerprint: *fingerprint,
                survivor: ids[0].clone(),
                condemned: ids[1..].to_vec(),
            })
            .collect()
    }

    /// Delete every condemned id, group by group.
    ///
    /// Condemned ids are first confirmed via multi-get; ids already absent
    /// are logged and counted, not deleted. Deletions are independent: a
    /// failure on one id does not stop the rest of its group, but the group
    /// is recorded as a [`PartialGroupFailure`].
    ///
    /// # Errors
    ///
    /// Returns `DedupError::Store` on a connection failure, which aborts the
    /// rest of the pass. The partial state reached so far is logged first.
    pub fn delete_condemned(&self, groups: &[ResolvedGroup]) -> Result<DedupStats, DedupError> {
        let mut stats = DedupStats {
            duplicate_groups: groups.len(),
            ..Default::default()
        };

        for group in groups {
            stats.condemned += group.condemned.len();

            let present = self
                .client
                .multi_get(&self.partition, &group.condemned)?;
            let present_ids: Vec<&String> = present.iter().map(|doc| &doc.id).collect();

            let mut group_deleted = 0usize;
            let mut group_failures: Vec<(String, String)> = Vec::new();

            for id in &group.condemned {
                if !present_ids.contains(&id) {
                    log::debug!(
                        "Condemned doc '{}' in '{}' already absent, skipping delete",
                        id,
                        self.partition
                    );
                    stats.already_absent += 1;
                    continue;
                }

                match self.client.delete_document(&self.partition, id) {
                    Ok(DeleteOutcome::Deleted) => {
                        group_deleted += 1;
                    }
                    Ok(DeleteOutcome::NotFound) => {
                        log::info!(
                            "Delete target '{}' in '{}' not found, continuing",
                            id,
                            self.partition
                        );
                        stats.already_absent += 1;
                    }
                    Err(err @ StoreError::Connection(_)) => {
                        // Fatal: report the partial state before aborting.
                        log::error!(
                            "Connection lost mid-group in '{}': group {} left with {} of {} deleted",
                            self.partition,
                            fingerprint_hex(&group.fingerprint),
                            group_deleted,
                            group.condemned.len()
                        );
                        return Err(err.into());
                    }
                    Err(err) => {
                        log::error!(
                            "Failed to delete doc '{}' in '{}': {}",
                            id,
                            self.partition,
                            err
                        );
                        group_failures.push((id.clone(), err.to_string()));
                    }
                }
            }

            stats.deleted += group_deleted;
            if !group_failures.is_empty() {
                stats.partial_failures.push(PartialGroupFailure {
                    fingerprint: fingerprint_hex(&group.fingerprint),
                    deleted: group_deleted,
                    failures: group_failures,
                });
            }
        }

        Ok(stats)
    }

    /// Clear all accumulated groups.
    ///
    /// Must be invoked before reusing the detector for another partition.
    pub fn reset(&mut self) {
        self.groups.clear();
    }
}

/// Run the full ingest -> resolve -> delete pass over one partition.
///
/// The scan is strictly sequential; `abort`, when set, interrupts the pass
/// at the next batch boundary.
///
/// # Errors
///
/// Propagates scan failures (including truncation: an incomplete scan must
/// not feed a delete pass), missing hash-key fields, interruption, and fatal
/// store errors.
pub fn dedup_partition(
    client: &dyn StoreClient,
    partition: &str,
    hash_keys: &[String],
    options: ScanOptions,
    abort: Option<&AtomicBool>,
) -> Result<DedupStats, DedupError> {
    log::info!("Deduplicating partition '{}'", partition);

    let mut detector = DuplicateDetector::new(client, partition, hash_keys);
    let mut scanner = CursorScanner::open(client, partition, options)?;

    loop {
        if abort.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            return Err(DedupError::Interrupted);
        }

        let batch = scanner.advance()?;
        if batch.done {
            break;
        }
        detector.ingest(&batch.documents)?;
    }

    let groups = detector.resolve();
    let stats = detector.delete_condemned(&groups)?;

    log::info!(
        "Partition '{}': {} duplicate groups, {} deleted, {} already absent, {} partial",
        partition,
        stats.duplicate_groups,
        stats.deleted,
        stats.already_absent,
        stats.partial_failures.len()
    );

    Ok(stats)
}
