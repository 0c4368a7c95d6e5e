//! Common types used across shard store operations.

use bytes::Bytes;

/// Key-value pair returned from range scans and rich queries.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use crosschain_storage::KeyValue;
///
/// let kv = KeyValue::new(Bytes::from("pc1"), Bytes::from(r#"{"ID":"pc1"}"#));
/// assert_eq!(kv.key_str(), Some("pc1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// The key identifying this entry.
    pub key: Bytes,

    /// The value stored at this key.
    pub value: Bytes,
}

impl KeyValue {
    /// Creates a new key-value pair.
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }

    /// Returns the key as UTF-8, if it is valid UTF-8.
    ///
    /// Service-layer keys are always textual identifiers; this is the
    /// accessor they use for logging and error context.
    pub fn key_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.key).ok()
    }
}
