//! HTTP implementation of the document-store protocol.
//!
//! Speaks the store's request/response protocol over a blocking `reqwest`
//! client: alias listing, scan open/continue, multi-get and delete-by-id.
//! The pipeline holds this behind `&dyn StoreClient`; nothing outside this
//! module knows about URLs or response shapes.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};

use super::{DeleteOutcome, Document, ScanPage, StoreClient, StoreError};

/// Connect timeout for every request. Scan reads get the lease window on top.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Concrete store client over HTTP.
pub struct HttpStoreClient {
    client: Client,
    base_url: String,
}

impl HttpStoreClient {
    /// Build a client for `host:port`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(host: &str, port: u16) -> Result<Self, StoreError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: format!("http://{host}:{port}"),
        })
    }

    fn map_transport_error(err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::TransientFetch(err.to_string())
        } else if err.is_connect() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Request(err.to_string())
        }
    }

    fn check_status(status: StatusCode, context: &str) -> Result<(), StoreError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(StoreError::Request(format!("{context}: HTTP {status}")))
        }
    }

    /// Extract the cursor id and hit documents from a scan response body.
    fn parse_scan_page(body: &Value) -> Result<ScanPage, StoreError> {
        let cursor = body
            .get("_scroll_id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Malformed("response has no _scroll_id".to_string()))?
            .to_string();

        let hits = body
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .ok_or_else(|| StoreError::Malformed("response has no hits array".to_string()))?;

        let documents = hits
            .iter()
            .map(Self::parse_hit)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ScanPage { cursor, documents })
    }

    fn parse_hit(hit: &Value) -> Result<Document, StoreError> {
        let id = hit
            .get("_id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Malformed("hit has no _id".to_string()))?
            .to_string();

        let fields = match hit.get("_source") {
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(StoreError::Malformed(format!(
                    "document {id} has a non-object _source"
                )))
            }
            None => serde_json::Map::new(),
        };

        Ok(Document { id, fields })
    }

    fn lease_param(lease: Duration) -> String {
        format!("{}s", lease.as_secs().max(1))
    }
}

impl StoreClient for HttpStoreClient {
    fn list_partitions(&self) -> Result<Vec<String>, StoreError> {
        let url = format!("{}/_aliases", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(Self::map_transport_error)?;
        Self::check_status(response.status(), "list partitions")?;

        let body: Value = response
            .json()
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        let names = body
            .as_object()
            .ok_or_else(|| StoreError::Malformed("alias listing is not an object".to_string()))?
            .keys()
            .cloned()
            .collect();

        Ok(names)
    }

    fn open_scan(
        &self,
        partition: &str,
        page_size: usize,
        lease: Duration,
    ) -> Result<ScanPage, StoreError> {
        let url = format!("{}/{partition}/_search", self.base_url);
        let body = json!({
            "query": { "match_all": {} },
            "size": page_size,
            "sort": [{ "_id": { "order": "asc" } }],
        });

        let response = self
            .client
            .post(&url)
            .query(&[("scroll", Self::lease_param(lease))])
            .json(&body)
            .send()
            .map_err(Self::map_transport_error)?;
        Self::check_status(response.status(), "open scan")?;

        let body: Value = response
            .json()
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        Self::parse_scan_page(&body)
    }

    fn continue_scan(&self, cursor: &str, lease: Duration) -> Result<ScanPage, StoreError> {
        let url = format!("{}/_search/scroll", self.base_url);
        let body = json!({
            "scroll": Self::lease_param(lease),
            "scroll_id": cursor,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(Self::map_transport_error)?;
        Self::check_status(response.status(), "continue scan")?;

        let body: Value = response
            .json()
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        Self::parse_scan_page(&body)
    }

    fn multi_get(&self, partition: &str, ids: &[String]) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}/{partition}/_mget", self.base_url);
        let body = json!({ "ids": ids });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(Self::map_transport_error)?;
        Self::check_status(response.status(), "multi-get")?;

        let body: Value = response
            .json()
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        let docs = body
            .get("docs")
            .and_then(Value::as_array)
            .ok_or_else(|| StoreError::Malformed("multi-get response has no docs".to_string()))?;

        // Absent ids come back with "found": false and are dropped here.
        docs.iter()
            .filter(|doc| doc.get("found").and_then(Value::as_bool).unwrap_or(false))
            .map(Self::parse_hit)
            .collect()
    }

    fn delete_document(&self, partition: &str, id: &str) -> Result<DeleteOutcome, StoreError> {
        let url = format!("{}/{partition}/_doc/{id}", self.base_url);
        let response = self
            .client
            .delete(&url)
            .send()
            .map_err(Self::map_transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::NotFound);
        }
        Self::check_status(response.status(), "delete document")?;

        Ok(DeleteOutcome::Deleted)
    }
}
