//! Queue entry types.
//!
//! A `QueueEntry` is one pending upload. It owns the file bytes outright and
//! carries the caller's upload options as an opaque generic `O` that the
//! queue forwards without looking inside.

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Number of random bytes appended to the timestamp in an entry id.
const ID_SUFFIX_BYTES: usize = 4;

/// A file handed to the queue, and later handed back to the upload operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Original filename (e.g. "consumer-unit.jpg").
    pub name: String,
    /// MIME type reported by the picker or camera.
    pub mime_type: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// A single pending upload persisted in the queue store.
///
/// Serialized as camelCase JSON with the payload base64-encoded so the
/// on-disk documents stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry<O> {
    /// Unique identifier: `<unix millis>-<random hex>`.
    pub id: String,
    /// File content.
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    /// Caller-defined options forwarded verbatim to the upload operation.
    pub upload_options: O,
    /// When the entry was queued (Unix ms).
    pub enqueued_at: u64,
    /// Number of soft upload rejections so far.
    pub retry_count: u32,
}

impl<O> QueueEntry<O> {
    /// Build a fresh entry with a new id and no retries.
    pub fn new(file: UploadFile, upload_options: O) -> Self {
        Self {
            id: new_entry_id(),
            payload: file.bytes,
            file_name: file.name,
            mime_type: file.mime_type,
            upload_options,
            enqueued_at: now_ms(),
            retry_count: 0,
        }
    }
}

/// Generate a queue entry id from the current time and OS randomness.
pub fn new_entry_id() -> String {
    let mut suffix = [0u8; ID_SUFFIX_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut suffix);
    format!("{}-{}", now_ms(), hex::encode(suffix))
}

/// Get the current time in milliseconds since Unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
