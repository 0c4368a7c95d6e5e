//! Shard store trait definition.
//!
//! [`StorageBackend`] is the interface the service layer uses to reach a
//! shard's ledger state. The ledger runtime behind it owns consistency,
//! ordering, replication and persistence; this trait only fixes the shape of
//! the calls.
//!
//! # Design
//!
//! - **Keys and values are bytes**: service code decides the encoding (flat JSON documents).
//! - **Async by default**: a real ledger is reached over the network.
//! - **Snapshot reads for scans**: [`get_range`](StorageBackend::get_range) and
//!   [`query`](StorageBackend::query) return owned results, so no iterator outlives the call.
//! - **Atomic single-key read-modify-write** via
//!   [`compare_and_set`](StorageBackend::compare_and_set).
//!
//! See [`MemoryBackend`](crate::MemoryBackend) for a reference implementation.

use std::ops::RangeBounds;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{error::StorageResult, selector::Selector, types::KeyValue};

/// Abstract per-shard key-value store.
///
/// Backends must be thread-safe (`Send + Sync`); a single backend handle is
/// shared by every concurrent invocation against its shard.
///
/// | Method | Ledger primitive |
/// |--------|------------------|
/// | [`get`](StorageBackend::get) | `GetState` |
/// | [`set`](StorageBackend::set) | `PutState` |
/// | [`delete`](StorageBackend::delete) | `DelState` |
/// | [`get_range`](StorageBackend::get_range) | `GetStateByRange` |
/// | [`query`](StorageBackend::query) | `GetQueryResult` |
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use crosschain_storage::{MemoryBackend, StorageBackend};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let backend = MemoryBackend::new();
///
/// backend.set(b"pc1".to_vec(), br#"{"ID":"pc1"}"#.to_vec()).await.unwrap();
/// let value = backend.get(b"pc1").await.unwrap();
/// assert_eq!(value, Some(Bytes::from(r#"{"ID":"pc1"}"#)));
/// # });
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Retrieves a value by key.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>>;

    /// Returns `true` if a value is stored under `key`.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn exists(&self, key: &[u8]) -> StorageResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Stores a key-value pair, overwriting any existing value.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()>;

    /// Atomically sets a key's value if it matches the expected current value.
    ///
    /// - **`expected: None`**: insert-if-absent. Fails with
    ///   [`Conflict`](crate::StorageError::Conflict) if any value is present.
    /// - **`expected: Some(value)`**: update-if-unchanged. Fails with
    ///   [`Conflict`](crate::StorageError::Conflict) if the key is absent or holds different
    ///   bytes.
    ///
    /// The comparison is exact, length-sensitive byte equality.
    #[must_use = "compare-and-set may fail with a conflict and errors must be handled"]
    async fn compare_and_set(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new_value: Vec<u8>,
    ) -> StorageResult<()>;

    /// Deletes a key. Deleting an absent key is a no-op.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn delete(&self, key: &[u8]) -> StorageResult<()>;

    /// Retrieves all key-value pairs within a range, in key order.
    ///
    /// An unbounded range (`..`) scans the shard's whole keyspace.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn get_range<R>(&self, range: R) -> StorageResult<Vec<KeyValue>>
    where
        R: RangeBounds<Vec<u8>> + Send;

    /// Runs a rich query, returning every entry whose JSON document matches
    /// `selector`, in key order.
    ///
    /// Values that are not JSON documents are skipped.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn query(&self, selector: &Selector) -> StorageResult<Vec<KeyValue>>;

    /// Verifies the backend can serve requests.
    #[must_use = "health check results indicate backend availability and must be inspected"]
    async fn health_check(&self) -> StorageResult<()>;
}
