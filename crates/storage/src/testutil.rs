//! Shared test utilities for shard store testing.
//!
//! Feature-gated behind `testutil` so nothing here leaks into production
//! builds. Enable it in `[dev-dependencies]`:
//!
//! ```toml
//! [dev-dependencies]
//! crosschain-storage = { path = "../storage", features = ["testutil"] }
//! ```

use std::{
    ops::RangeBounds,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    StorageBackend,
    error::{StorageError, StorageResult},
    memory::MemoryBackend,
    selector::Selector,
    types::KeyValue,
};

/// Create a deterministic test key from a prefix and index.
///
/// Produces keys like `"prefix:000042"`. The zero-padding keeps
/// lexicographic order equal to numeric order.
#[must_use]
pub fn make_key(prefix: &str, idx: usize) -> Vec<u8> {
    format!("{prefix}:{idx:06}").into_bytes()
}

/// Create a [`MemoryBackend`] holding `count` JSON documents under
/// [`make_key`] keys, each `{"n": idx}`.
///
/// # Panics
///
/// Panics if any `set` operation fails (should not happen with `MemoryBackend`).
pub async fn populated_backend(prefix: &str, count: usize) -> MemoryBackend {
    let backend = MemoryBackend::new();
    for i in 0..count {
        let value = format!(r#"{{"n":{i}}}"#).into_bytes();
        backend.set(make_key(prefix, i), value).await.expect("populate set failed");
    }
    backend
}

/// A [`MemoryBackend`] wrapper whose operations can be switched to fail with
/// [`StorageError::Connection`], standing in for an unreachable ledger peer.
///
/// Counts every call so tests can assert how many store round-trips an
/// operation made.
#[derive(Clone, Default)]
pub struct FailingBackend {
    inner: MemoryBackend,
    failing: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl FailingBackend {
    /// Wraps an existing backend. Starts healthy.
    pub fn new(inner: MemoryBackend) -> Self {
        Self { inner, failing: Arc::new(AtomicBool::new(false)), calls: Arc::default() }
    }

    /// Makes every subsequent call fail (`true`) or succeed (`false`).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of backend calls observed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The wrapped backend, for seeding and inspection.
    pub fn inner(&self) -> &MemoryBackend {
        &self.inner
    }

    fn check(&self) -> StorageResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::connection("injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FailingBackend {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        self.check()?;
        self.inner.set(key, value).await
    }

    async fn compare_and_set(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new_value: Vec<u8>,
    ) -> StorageResult<()> {
        self.check()?;
        self.inner.compare_and_set(key, expected, new_value).await
    }

    async fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn get_range<R>(&self, range: R) -> StorageResult<Vec<KeyValue>>
    where
        R: RangeBounds<Vec<u8>> + Send,
    {
        self.check()?;
        self.inner.get_range(range).await
    }

    async fn query(&self, selector: &Selector) -> StorageResult<Vec<KeyValue>> {
        self.check()?;
        self.inner.query(selector).await
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.check()?;
        self.inner.health_check().await
    }
}

/// Assert that a [`StorageResult`] is a [`StorageError::Conflict`].
#[macro_export]
macro_rules! assert_conflict {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::Conflict)),
            "expected StorageError::Conflict, got: {:?}",
            $result,
        );
    };
}

/// Assert that a [`StorageResult`] is a [`StorageError::Connection`].
#[macro_export]
macro_rules! assert_connection_error {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::Connection { .. })),
            "expected StorageError::Connection, got: {:?}",
            $result,
        );
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_populated_backend_key_order() {
        let backend = populated_backend("rec", 12).await;
        let all = backend.get_range::<std::ops::RangeFull>(..).await.unwrap();
        assert_eq!(all.len(), 12);
        assert_eq!(all[0].key_str(), Some("rec:000000"));
        assert_eq!(all[11].key_str(), Some("rec:000011"));
    }

    #[tokio::test]
    async fn test_failing_backend_toggles() {
        let backend = FailingBackend::new(MemoryBackend::new());
        backend.set(b"k".to_vec(), b"v".to_vec()).await.unwrap();

        backend.set_failing(true);
        assert_connection_error!(backend.get(b"k").await);

        backend.set_failing(false);
        assert_eq!(backend.get(b"k").await.unwrap(), Some(Bytes::from("v")));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_assert_conflict_macro() {
        let backend = MemoryBackend::new();
        backend.set(b"k".to_vec(), b"v".to_vec()).await.unwrap();
        assert_conflict!(backend.compare_and_set(b"k", None, b"w".to_vec()).await);
    }
}
