//! Document-store access layer.
//!
//! This module defines the store-facing data model and the [`StoreClient`]
//! capability trait the rest of the pipeline is written against:
//! - [`http`]: concrete HTTP client for the document-store protocol
//! - [`scanner`]: paginated full-partition scan on top of any client
//!
//! Components hold a `&dyn StoreClient` rather than a concrete client, so the
//! dedup and diff passes can be driven by an in-memory store in tests.

pub mod http;
pub mod scanner;

use std::time::Duration;

use serde_json::Value;

// Re-export main types
pub use http::HttpStoreClient;
pub use scanner::{Batch, CursorScanner, ScanError, ScanOptions};

/// A single document fetched from the store.
///
/// Owned transiently by whichever component is iterating a page;
/// never persisted locally.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-assigned document id.
    pub id: String,
    /// The document's source fields.
    pub fields: serde_json::Map<String, Value>,
}

impl Document {
    /// Create a document with no fields.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: serde_json::Map::new(),
        }
    }

    /// Builder-style helper to attach a field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Render a field value the way it participates in fingerprints and
    /// reconstructed lines: strings verbatim, everything else via its
    /// JSON representation.
    #[must_use]
    pub fn field_text(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// One page of a paginated scan.
#[derive(Debug, Clone)]
pub struct ScanPage {
    /// Cursor handle for the next continuation.
    pub cursor: String,
    /// Documents in this page. Empty signals completion.
    pub documents: Vec<Document>,
}

/// Outcome of a delete-by-id request.
///
/// Not-found is a recoverable outcome, not an error: the target was
/// already absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The document existed and was deleted.
    Deleted,
    /// The document was already absent.
    NotFound,
}

/// Errors surfaced by store operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The store is unreachable. Fatal for the current operation.
    #[error("failed to connect to document store: {0}")]
    Connection(String),

    /// Cursor lease expiry or fetch timeout. Surfaced to the caller;
    /// no implicit retry is performed.
    #[error("transient fetch failure: {0}")]
    TransientFetch(String),

    /// The store rejected a request (non-2xx response).
    #[error("store rejected request: {0}")]
    Request(String),

    /// The store returned a response the client could not interpret.
    #[error("malformed store response: {0}")]
    Malformed(String),
}

/// Capability interface over the document store.
///
/// The concrete HTTP client implements this; core components hold it by
/// reference (composition, never inheritance from a vendor client).
pub trait StoreClient: Send + Sync {
    /// List every partition name known to the store.
    fn list_partitions(&self) -> Result<Vec<String>, StoreError>;

    /// Open a full scan over one partition: `match_all`, sorted by id
    /// ascending for determinism. Returns the first page and a cursor.
    fn open_scan(
        &self,
        partition: &str,
        page_size: usize,
        lease: Duration,
    ) -> Result<ScanPage, StoreError>;

    /// Fetch the next page for a cursor, renewing its lease.
    /// An empty page signals completion.
    fn continue_scan(&self, cursor: &str, lease: Duration) -> Result<ScanPage, StoreError>;

    /// Batch document retrieval by id. Absent ids are simply not returned.
    fn multi_get(&self, partition: &str, ids: &[String]) -> Result<Vec<Document>, StoreError>;

    /// Delete a single document by id.
    fn delete_document(&self, partition: &str, id: &str) -> Result<DeleteOutcome, StoreError>;
}

/// Filter out partitions whose name starts with a reserved prefix and sort
/// the remainder for deterministic processing order.
///
/// Matching is a case-sensitive `starts_with`, mirroring the store's own
/// convention for internal partitions (`.kibana`, `.metricbeat`, ...).
#[must_use]
pub fn filter_reserved(mut names: Vec<String>, reserved: &[String]) -> Vec<String> {
    names.retain(|name| {
        let keep = !reserved.iter().any(|prefix| name.starts_with(prefix));
        if !keep {
            log::debug!("Skipping reserved partition: {}", name);
        }
        keep
    });
    names.sort();
    names
}
