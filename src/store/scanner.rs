//! Paginated full-partition scanning.
//!
//! [`CursorScanner`] exhausts one partition of the document store by
//! repeatedly advancing a server-granted cursor. Every advance implicitly
//! renews the cursor's lease. A configurable hard cap on advances acts as a
//! safety valve: hitting it before the store signals completion means the
//! scan was cut short, which is surfaced as [`ScanError::Truncated`] rather
//! than silently treated as a finished scan, since a truncated scan would poison
//! both the dedup and diff passes downstream.

use std::time::Duration;

use super::{Document, StoreClient, StoreError};

/// Options controlling a partition scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Documents requested per page.
    pub page_size: usize,
    /// Lease window granted to the cursor; renewed by every advance.
    pub lease: Duration,
    /// Hard cap on the number of advances for one partition.
    pub max_advances: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            page_size: 1000,
            lease: Duration::from_secs(120),
            max_advances: 1000,
        }
    }
}

/// One batch of documents handed to the caller.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Documents in this batch. Empty when `done`.
    pub documents: Vec<Document>,
    /// True once the partition is exhausted. No further `advance`
    /// calls are valid after a done batch.
    pub done: bool,
}

/// Errors surfaced while scanning a partition.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    /// The advance cap was reached before the store signaled completion.
    /// The scan is incomplete and must not be treated as a full pass.
    #[error("scan of partition '{partition}' truncated after {advances} advances")]
    Truncated { partition: String, advances: usize },

    /// An underlying store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Paginated scanner over one partition.
///
/// `open` issues the initial search and buffers the first page; `advance`
/// then yields batches until an empty page marks the partition exhausted.
/// The scanner performs no retries itself: transient fetch errors are
/// surfaced and the caller decides.
pub struct CursorScanner<'a> {
    client: &'a dyn StoreClient,
    partition: String,
    options: ScanOptions,
    cursor: String,
    first_page: Option<Vec<Document>>,
    advances: usize,
    done: bool,
}

impl<'a> CursorScanner<'a> {
    /// Open a scan over `partition`, fetching the first page.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Store` if the initial search fails.
    pub fn open(
        client: &'a dyn StoreClient,
        partition: &str,
        options: ScanOptions,
    ) -> Result<Self, ScanError> {
        let page = client.open_scan(partition, options.page_size, options.lease)?;
        log::trace!(
            "Opened scan on '{}': first page has {} documents",
            partition,
            page.documents.len()
        );

        Ok(Self {
            client,
            partition: partition.to_string(),
            options,
            cursor: page.cursor,
            first_page: Some(page.documents),
            advances: 0,
            done: false,
        })
    }

    /// The partition being scanned.
    #[must_use]
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Number of advances performed so far.
    #[must_use]
    pub fn advances(&self) -> usize {
        self.advances
    }

    /// Fetch the next batch, renewing the cursor lease.
    ///
    /// The first call returns the page buffered by `open`. A batch with
    /// `done == true` (always empty) marks the partition exhausted.
    ///
    /// # Errors
    ///
    /// - `ScanError::Truncated` when the advance cap is reached before the
    ///   store reports completion
    /// - `ScanError::Store` on timeout or connection failure; no retry is
    ///   attempted
    pub fn advance(&mut self) -> Result<Batch, ScanError> {
        if self.done {
            return Ok(Batch {
                documents: Vec::new(),
                done: true,
            });
        }

        if self.advances >= self.options.max_advances {
            log::error!(
                "Scan of '{}' hit the advance cap ({}) before completion",
                self.partition,
                self.options.max_advances
            );
            return Err(ScanError::Truncated {
                partition: self.partition.clone(),
                advances: self.advances,
            });
        }
        self.advances += 1;

        let documents = match self.first_page.take() {
            Some(docs) => docs,
            None => {
                let page = self.client.continue_scan(&self.cursor, self.options.lease)?;
                self.cursor = page.cursor;
                page.documents
            }
        };

        if documents.is_empty() {
            self.done = true;
            log::debug!(
                "Scan of '{}' complete after {} advances",
                self.partition,
                self.advances
            );
        }

        Ok(Batch {
            done: documents.is_empty(),
            documents,
        })
    }

    /// Drain the remaining batches into one vector.
    ///
    /// Convenience for callers that need the whole partition at once and
    /// accept the memory cost.
    ///
    /// # Errors
    ///
    /// Propagates the first `advance` failure, including truncation.
    pub fn collect_all(mut self) -> Result<Vec<Document>, ScanError> {
        let mut all = Vec::new();
        loop {
            let batch = self.advance()?;
            if batch.done {
                return Ok(all);
            }
            all.extend(batch.documents);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DeleteOutcome, ScanPage};
    use std::sync::Mutex;

    /// Minimal scripted client: serves fixed pages, then an empty one.
    struct PagedClient {
        pages: Mutex<Vec<Vec<Document>>>,
    }

    impl PagedClient {
        fn new(mut pages: Vec<Vec<Document>>) -> Self {
            pages.reverse();
            Self {
                pages: Mutex::new(pages),
            }
        }

        fn next_page(&self) -> ScanPage {
            let documents = self.pages.lock().unwrap().pop().unwrap_or_default();
            ScanPage {
                cursor: "c1".to_string(),
                documents,
            }
        }
    }

    impl StoreClient for PagedClient {
        fn list_partitions(&self) -> Result<Vec<String>, StoreError> {
            Ok(vec![])
        }

        fn open_scan(
            &self,
            _partition: &str,
            _page_size: usize,
            _lease: Duration,
        ) -> Result<ScanPage, StoreError> {
            Ok(self.next_page())
        }

        fn continue_scan(&self, _cursor: &str, _lease: Duration) -> Result<ScanPage, StoreError> {
            Ok(self.next_page())
        }

        fn multi_get(
            &self,
            _partition: &str,
            _ids: &[String],
        ) -> Result<Vec<Document>, StoreError> {
            Ok(vec![])
        }

        fn delete_document(&self, _partition: &str, _id: &str) -> Result<DeleteOutcome, StoreError> {
            Ok(DeleteOutcome::NotFound)
        }
    }

    fn doc(id: &str) -> Document {
        Document::new(id)
    }

    #[test]
    fn test_scanner_exhausts_pages() {
        let client = PagedClient::new(vec![vec![doc("1"), doc("2")], vec![doc("3")]]);
        let scanner = CursorScanner::open(&client, "p", ScanOptions::default()).unwrap();

        let all = scanner.collect_all().unwrap();
        let ids: Vec<&str> = all.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_scanner_done_on_empty_first_page() {
        let client = PagedClient::new(vec![vec![]]);
        let mut scanner = CursorScanner::open(&client, "p", ScanOptions::default()).unwrap();

        let batch = scanner.advance().unwrap();
        assert!(batch.done);
        assert!(batch.documents.is_empty());

        // Advancing past done stays done.
        let batch = scanner.advance().unwrap();
        assert!(batch.done);
    }

    #[test]
    fn test_scanner_truncation_surfaced() {
        // Three non-empty pages but a cap of 2 advances.
        let client = PagedClient::new(vec![vec![doc("1")], vec![doc("2")], vec![doc("3")]]);
        let options = ScanOptions {
            max_advances: 2,
            ..Default::default()
        };
        let mut scanner = CursorScanner::open(&client, "p", options).unwrap();

        assert!(!scanner.advance().unwrap().done);
        assert!(!scanner.advance().unwrap().done);

        match scanner.advance() {
            Err(ScanError::Truncated { partition, advances }) => {
                assert_eq!(partition, "p");
                assert_eq!(advances, 2);
            }
            other => panic!("expected truncation, got {:?}", other.map(|b| b.done)),
        }
    }

    #[test]
    fn test_collect_all_propagates_truncation() {
        let client = PagedClient::new(vec![vec![doc("1")], vec![doc("2")], vec![doc("3")]]);
        let options = ScanOptions {
            max_advances: 1,
            ..Default::default()
        };
        let scanner = CursorScanner::open(&client, "p", options).unwrap();

        assert!(matches!(
            scanner.collect_all(),
            Err(ScanError::Truncated { .. })
        ));
    }
}
