//! Shared test fixtures: an in-memory store client with paging and scripted
//! failures.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use logaudit::store::{DeleteOutcome, Document, ScanPage, StoreClient, StoreError};

/// In-memory store backing a full [`StoreClient`] implementation.
///
/// Scans page through the partition's documents in insertion order; the
/// cursor is `partition:offset`. Deletions mutate the shared state, so a
/// later scan observes them.
#[derive(Default)]
pub struct MockStoreClient {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    partitions: BTreeMap<String, Vec<Document>>,
    // Ids whose deletion fails with a Request error.
    fail_delete: HashSet<String>,
    // Ids whose deletion fails with a Connection error.
    drop_connection: HashSet<String>,
    delete_log: Vec<String>,
}

impl MockStoreClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document into a partition, creating the partition if needed.
    pub fn insert(&self, partition: &str, doc: Document) {
        let mut state = self.state.lock().unwrap();
        state
            .partitions
            .entry(partition.to_string())
            .or_default()
            .push(doc);
    }

    /// Make deletion of `id` fail with a `Request` error.
    pub fn fail_delete_of(&self, id: &str) {
        self.state.lock().unwrap().fail_delete.insert(id.to_string());
    }

    /// Make deletion of `id` fail with a `Connection` error.
    pub fn drop_connection_on_delete_of(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .drop_connection
            .insert(id.to_string());
    }

    /// Ids deleted so far, in request order.
    pub fn deleted_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().delete_log.clone()
    }

    /// Remaining document ids in a partition, in storage order.
    pub fn remaining_ids(&self, partition: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .partitions
            .get(partition)
            .map(|docs| docs.iter().map(|d| d.id.clone()).collect())
            .unwrap_or_default()
    }

    fn page(&self, partition: &str, offset: usize, page_size: usize) -> ScanPage {
        let state = self.state.lock().unwrap();
        let docs = state.partitions.get(partition).cloned().unwrap_or_default();
        let end = (offset + page_size).min(docs.len());
        let documents = if offset < docs.len() {
            docs[offset..end].to_vec()
        } else {
            Vec::new()
        };

        ScanPage {
            cursor: format!("{partition}:{end}:{page_size}"),
            documents,
        }
    }
}

impl StoreClient for MockStoreClient {
    fn list_partitions(&self) -> Result<Vec<String>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.partitions.keys().cloned().collect())
    }

    fn open_scan(
        &self,
        partition: &str,
        page_size: usize,
        _lease: Duration,
    ) -> Result<ScanPage, StoreError> {
        Ok(self.page(partition, 0, page_size))
    }

    fn continue_scan(&self, cursor: &str, _lease: Duration) -> Result<ScanPage, StoreError> {
        let mut parts = cursor.rsplitn(3, ':');
        let page_size: usize = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| StoreError::Malformed(format!("bad cursor '{cursor}'")))?;
        let offset: usize = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| StoreError::Malformed(format!("bad cursor '{cursor}'")))?;
        let partition = parts
            .next()
            .ok_or_else(|| StoreError::Malformed(format!("bad cursor '{cursor}'")))?;

        Ok(self.page(partition, offset, page_size))
    }

    fn multi_get(&self, partition: &str, ids: &[String]) -> Result<Vec<Document>, StoreError> {
        let state = self.state.lock().unwrap();
        let docs = state.partitions.get(partition).cloned().unwrap_or_default();
        Ok(docs
            .into_iter()
            .filter(|doc| ids.contains(&doc.id))
            .collect())
    }

    fn delete_document(&self, partition: &str, id: &str) -> Result<DeleteOutcome, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.drop_connection.contains(id) {
            return Err(StoreError::Connection(format!(
                "connection reset while deleting '{id}'"
            )));
        }
        if state.fail_delete.contains(id) {
            return Err(StoreError::Request(format!(
                "scripted delete failure for '{id}'"
            )));
        }

        let docs = match state.partitions.get_mut(partition) {
            Some(docs) => docs,
            None => return Ok(DeleteOutcome::NotFound),
        };
        let before = docs.len();
        docs.retain(|doc| doc.id != id);

        if docs.len() == before {
            Ok(DeleteOutcome::NotFound)
        } else {
            state.delete_log.push(id.to_string());
            Ok(DeleteOutcome::Deleted)
        }
    }
}

/// A log document with a `message` and `host` field, the common fixture
/// shape.
pub fn log_doc(id: &str, message: &str, host: &str) -> Document {
    Document::new(id)
        .with_field("message", message)
        .with_field("host", host)
}
