//! Content fingerprinting with BLAKE3.
//!
//! A document's fingerprint is the digest of its hash-key field values
//! concatenated in configured key order. Two documents with equal
//! fingerprints are duplicates by definition, regardless of id.

use crate::store::Document;

use super::DedupError;

/// A 32-byte BLAKE3 content fingerprint.
pub type Fingerprint = [u8; 32];

/// Render a fingerprint as a lowercase hex string.
#[must_use]
pub fn fingerprint_hex(fingerprint: &Fingerprint) -> String {
    let mut hex = String::with_capacity(64);
    for byte in fingerprint {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// Compute a document's content fingerprint over `hash_keys`, in order.
///
/// String field values participate verbatim; other values via their JSON
/// representation.
///
/// # Errors
///
/// Returns `DedupError::MissingField` if any hash-key field is absent on
/// the document.
pub fn fingerprint_document(
    doc: &Document,
    hash_keys: &[String],
) -> Result<Fingerprint, DedupError> {
    let mut hasher = blake3::Hasher::new();

    for key in hash_keys {
        let value = doc
            .field_text(key)
            .ok_or_else(|| DedupError::MissingField {
                doc_id: doc.id.clone(),
                field: key.clone(),
            })?;
        hasher.update(value.as_bytes());
    }

    Ok(*hasher.finalize().as_bytes())
}
