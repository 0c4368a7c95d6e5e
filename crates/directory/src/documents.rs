//! Typed JSON document access over a [`StorageBackend`].
//!
//! Both shard services store one document type under its own key. This
//! module holds the shared create/read/update/delete/scan logic so the
//! services only add their domain operations.

use std::{marker::PhantomData, vec};

use crosschain_storage::{KeyValue, Selector, StorageBackend, StorageError};

use crate::{
    error::{DirectoryError, DirectoryResult},
    record::Document,
};

pub(crate) fn encode<T: Document>(doc: &T) -> DirectoryResult<Vec<u8>> {
    serde_json::to_vec(doc).map_err(|e| {
        StorageError::serialization_with_source(format!("failed to encode {}", doc.key()), e).into()
    })
}

pub(crate) fn decode<T: Document>(key: &str, bytes: &[u8]) -> DirectoryResult<T> {
    serde_json::from_slice(bytes)
        .map_err(|source| DirectoryError::Decode { key: key.to_owned(), source })
}

/// Typed document collection backed by one shard store.
pub(crate) struct DocumentStore<S, T> {
    store: S,
    _doc: PhantomData<fn() -> T>,
}

impl<S: StorageBackend, T: Document> DocumentStore<S, T> {
    pub(crate) fn new(store: S) -> Self {
        Self { store, _doc: PhantomData }
    }

    pub(crate) fn backend(&self) -> &S {
        &self.store
    }

    pub(crate) async fn exists(&self, key: &str) -> DirectoryResult<bool> {
        Ok(self.store.exists(key.as_bytes()).await?)
    }

    /// Inserts the document if its key is free.
    pub(crate) async fn create(&self, doc: &T) -> DirectoryResult<()> {
        let bytes = encode(doc)?;
        match self.store.compare_and_set(doc.key().as_bytes(), None, bytes).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_conflict() => Err(DirectoryError::already_exists(doc.key())),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) async fn read(&self, key: &str) -> DirectoryResult<T> {
        let bytes =
            self.store.get(key.as_bytes()).await?.ok_or_else(|| DirectoryError::not_found(key))?;
        decode(key, &bytes)
    }

    /// Overwrites an existing document.
    ///
    /// The write is conditional on the bytes observed by the existence check,
    /// so a concurrent delete cannot be silently undone.
    pub(crate) async fn update(&self, doc: &T) -> DirectoryResult<()> {
        let key = doc.key();
        let current =
            self.store.get(key.as_bytes()).await?.ok_or_else(|| DirectoryError::not_found(key))?;
        let bytes = encode(doc)?;
        self.store.compare_and_set(key.as_bytes(), Some(&current), bytes).await?;
        Ok(())
    }

    pub(crate) async fn delete(&self, key: &str) -> DirectoryResult<()> {
        if !self.store.exists(key.as_bytes()).await? {
            return Err(DirectoryError::not_found(key));
        }
        self.store.delete(key.as_bytes()).await?;
        Ok(())
    }

    /// Read-modify-write of a single document.
    ///
    /// `apply` sees the decoded document; the result is written back with a
    /// compare-and-set against the bytes that were read. A concurrent writer
    /// surfaces as [`StorageError::Conflict`].
    pub(crate) async fn modify<F>(&self, key: &str, apply: F) -> DirectoryResult<T>
    where
        F: FnOnce(&mut T) + Send,
    {
        let current =
            self.store.get(key.as_bytes()).await?.ok_or_else(|| DirectoryError::not_found(key))?;
        let mut doc: T = decode(key, &current)?;
        apply(&mut doc);
        let bytes = encode(&doc)?;
        self.store.compare_and_set(key.as_bytes(), Some(&current), bytes).await?;
        Ok(doc)
    }

    pub(crate) async fn list_all(&self) -> DirectoryResult<Documents<T>> {
        let entries = self.store.get_range::<std::ops::RangeFull>(..).await?;
        Ok(Documents::new(entries))
    }

    pub(crate) async fn query(&self, selector: &Selector) -> DirectoryResult<Documents<T>> {
        let entries = self.store.query(selector).await?;
        Ok(Documents::new(entries))
    }
}

/// Lazy iterator over a snapshot of a shard's documents, in store key order.
///
/// The snapshot is taken when the iterator is created; each item is decoded
/// only when it is reached. An undecodable document yields an `Err` item
/// and iteration may continue past it. Everything the iterator holds is
/// owned, so dropping it early releases the snapshot.
pub struct Documents<T> {
    entries: vec::IntoIter<KeyValue>,
    _doc: PhantomData<fn() -> T>,
}

impl<T> Documents<T> {
    fn new(entries: Vec<KeyValue>) -> Self {
        Self { entries: entries.into_iter(), _doc: PhantomData }
    }
}

impl<T: Document> Iterator for Documents<T> {
    type Item = DirectoryResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let kv = self.entries.next()?;
        let key = String::from_utf8_lossy(&kv.key);
        Some(decode(&key, &kv.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<T: Document> ExactSizeIterator for Documents<T> {}

impl<T> std::fmt::Debug for Documents<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Documents").field("remaining", &self.entries.len()).finish()
    }
}
