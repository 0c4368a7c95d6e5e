//! Global directory service.
//!
//! The directory maps an owner id to the regional shard holding that
//! owner's records. Resolution is two hops:
//!
//! ```text
//!  resolve_by_owner("HP1", Some("pc2"))
//!     │
//!     ├─ phase 1: read DirectoryEntry "HP1" from the directory store
//!     │           → { regionalCCName: "regionalA" }
//!     │
//!     └─ phase 2: registry.invoke("regionalA", "ReadAsset", ["pc2"])
//!                 → RegionalRecord { ID: "pc2", owner: "Alice", ... }
//! ```
//!
//! Phase 2 is a read; neither phase writes, so a failed cross-shard hop
//! leaves the directory exactly as it was.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use crosschain_storage::{Selector, StorageBackend};

use crate::{
    channel::{InvokeResponse, OP_READ_ASSET, ShardEndpoint, ShardRegistry},
    documents::{DocumentStore, Documents},
    error::{DirectoryError, DirectoryResult},
    metrics::{Hop, HopMetrics},
    record::{DirectoryEntry, RegionalRecord},
};

/// Operation resolving `[record_id, owner_id]` through the owner's entry.
pub const OP_READ_REGIONAL_ASSET: &str = "ReadRegionalAsset";
/// Operation resolving `[record_id, owner_id]` through a rich query.
pub const OP_QUERY_BY_POLICY_AND_OWNER: &str = "QueryAssetsByPolicyAndHospital";

/// Number of entries seeded by [`GlobalDirectory::init_ledger`].
const SEED_ENTRIES: usize = 5;

/// Lazy iterator over the directory's entries.
pub type Entries = Documents<DirectoryEntry>;

/// Owner id → regional shard directory.
pub struct GlobalDirectory<S> {
    docs: DocumentStore<S, DirectoryEntry>,
    registry: Arc<ShardRegistry>,
    metrics: HopMetrics,
}

#[bon::bon]
impl<S: StorageBackend> GlobalDirectory<S> {
    /// Creates a directory over `store` that resolves through `registry`.
    #[builder]
    pub fn new(
        store: S,
        registry: Arc<ShardRegistry>,
        #[builder(default)] metrics: HopMetrics,
    ) -> Self {
        Self { docs: DocumentStore::new(store), registry, metrics }
    }

    pub fn metrics(&self) -> &HopMetrics {
        &self.metrics
    }

    /// The underlying directory store.
    pub fn backend(&self) -> &S {
        self.docs.backend()
    }

    /// Seeds `HP1..HP5 → regionalCC1..regionalCC5`.
    ///
    /// Existing entries are overwritten.
    #[tracing::instrument(skip(self))]
    pub async fn init_ledger(&self) -> DirectoryResult<()> {
        for i in 1..=SEED_ENTRIES {
            let entry = DirectoryEntry::new(format!("HP{i}"), format!("regionalCC{i}"));
            let bytes = crate::documents::encode(&entry)?;
            self.docs.backend().set(entry.owner_id.into_bytes(), bytes).await?;
        }
        tracing::info!(count = SEED_ENTRIES, "Seeded global directory");
        Ok(())
    }

    pub async fn exists(&self, owner_id: &str) -> DirectoryResult<bool> {
        self.docs.exists(owner_id).await
    }

    /// Inserts a new entry.
    ///
    /// The target shard is not checked; an unreachable shard only shows up
    /// when the entry is resolved.
    #[tracing::instrument(skip(self, entry), fields(owner_id = %entry.owner_id, shard = %entry.shard))]
    pub async fn create(&self, entry: &DirectoryEntry) -> DirectoryResult<()> {
        self.docs.create(entry).await
    }

    /// Reads one entry, timing it as an [`Hop::IndexLookup`].
    pub async fn read(&self, owner_id: &str) -> DirectoryResult<DirectoryEntry> {
        let (result, _) = self.timed(Hop::IndexLookup, self.docs.read(owner_id)).await;
        result
    }

    #[tracing::instrument(skip(self, entry), fields(owner_id = %entry.owner_id))]
    pub async fn update(&self, entry: &DirectoryEntry) -> DirectoryResult<()> {
        self.docs.update(entry).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, owner_id: &str) -> DirectoryResult<()> {
        self.docs.delete(owner_id).await
    }

    /// Points an owner at a different shard, leaving every other field as is.
    #[tracing::instrument(skip(self))]
    pub async fn transfer_shard(
        &self,
        owner_id: &str,
        new_shard: &str,
    ) -> DirectoryResult<DirectoryEntry> {
        self.docs.modify(owner_id, |entry| entry.shard = new_shard.to_owned()).await
    }

    /// Snapshot iterator over every entry in key order.
    pub async fn list_all(&self) -> DirectoryResult<Entries> {
        self.docs.list_all().await
    }

    /// Resolves an owner's record through its directory entry.
    ///
    /// The record id is `record_id` when given, else the entry's
    /// `policyID`, else `owner_id` itself.
    ///
    /// # Errors
    ///
    /// - [`DirectoryError::NotFound`] if the owner has no entry.
    /// - [`DirectoryError::CrossShard`] if the shard is unknown, answers
    ///   non-OK, or returns an undecodable record.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_by_owner(
        &self,
        owner_id: &str,
        record_id: Option<&str>,
    ) -> DirectoryResult<RegionalRecord> {
        let start = Instant::now();
        let result = async {
            let (entry, index_elapsed) =
                self.timed(Hop::IndexLookup, self.docs.read(owner_id)).await;
            let entry = entry?;
            let record_id = record_id
                .or(entry.record_id.as_deref())
                .unwrap_or(owner_id)
                .to_owned();
            let (record, cross_elapsed) = self.cross_shard(&entry.shard, &record_id).await;
            tracing::debug!(
                shard = %entry.shard,
                record_id = %record_id,
                index_us = index_elapsed.as_micros() as u64,
                cross_shard_us = cross_elapsed.as_micros() as u64,
                "Resolved by owner"
            );
            record
        }
        .await;
        self.metrics.record(Hop::Resolve, start.elapsed(), result.is_ok());
        result
    }

    /// Resolves a record by querying the directory for an entry with both
    /// `policyID == record_id` and `hospitalID == owner_id`.
    ///
    /// Only the first match in store order is used. Further matches are
    /// ignored and reported with a warning.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_by_query(
        &self,
        owner_id: &str,
        record_id: &str,
    ) -> DirectoryResult<RegionalRecord> {
        let start = Instant::now();
        let result = async {
            let selector = Selector::new().eq("policyID", record_id).eq("hospitalID", owner_id);
            let (matches, index_elapsed) =
                self.timed(Hop::IndexLookup, self.docs.query(&selector)).await;
            let mut matches = matches?;
            if matches.len() > 1 {
                tracing::warn!(
                    selector = %selector,
                    matches = matches.len(),
                    "Multiple directory entries match; using the first"
                );
            }
            let entry = matches.next().ok_or_else(|| DirectoryError::not_found(owner_id))??;

            let (record, cross_elapsed) = self.cross_shard(&entry.shard, record_id).await;
            tracing::debug!(
                shard = %entry.shard,
                index_us = index_elapsed.as_micros() as u64,
                cross_shard_us = cross_elapsed.as_micros() as u64,
                "Resolved by query"
            );
            record
        }
        .await;
        self.metrics.record(Hop::Resolve, start.elapsed(), result.is_ok());
        result
    }

    async fn cross_shard(
        &self,
        shard: &str,
        record_id: &str,
    ) -> (DirectoryResult<RegionalRecord>, Duration) {
        let call = async {
            self.registry
                .invoke_record(shard, record_id, self.registry.scope())
                .await
                .map_err(|source| DirectoryError::cross_shard(shard, record_id, source))
        };
        self.timed(Hop::CrossShard, call).await
    }

    async fn timed<T, F>(&self, hop: Hop, fut: F) -> (DirectoryResult<T>, Duration)
    where
        F: Future<Output = DirectoryResult<T>>,
    {
        let start = Instant::now();
        let result = fut.await;
        let elapsed = start.elapsed();
        self.metrics.record(hop, elapsed, result.is_ok());
        (result, elapsed)
    }
}

/// Exposes the directory's compound lookups on the invocation channel.
///
/// The directory must be registered in a different registry from the one
/// it resolves through.
#[async_trait]
impl<S: StorageBackend + 'static> ShardEndpoint for GlobalDirectory<S> {
    async fn handle(&self, op: &str, args: &[String]) -> InvokeResponse {
        let result = match (op, args) {
            (OP_READ_ASSET, [owner_id]) => self.read(owner_id).await.and_then(|e| to_json(&e)),
            (OP_READ_REGIONAL_ASSET, [record_id, owner_id]) => {
                // An empty record id defers to the entry's own policyID.
                let record_id = Some(record_id.as_str()).filter(|id| !id.is_empty());
                self.resolve_by_owner(owner_id, record_id).await.and_then(|r| to_json(&r))
            },
            (OP_QUERY_BY_POLICY_AND_OWNER, [record_id, owner_id]) => {
                self.resolve_by_query(owner_id, record_id).await.and_then(|r| to_json(&r))
            },
            (OP_READ_ASSET | OP_READ_REGIONAL_ASSET | OP_QUERY_BY_POLICY_AND_OWNER, _) => {
                return InvokeResponse::error(format!("{op}: incorrect number of arguments"));
            },
            _ => return InvokeResponse::error(format!("unknown operation: {op}")),
        };
        match result {
            Ok(payload) => InvokeResponse::ok(payload),
            Err(e) if e.is_not_found() => InvokeResponse::not_found(e.to_string()),
            Err(e) => InvokeResponse::error(e.to_string()),
        }
    }

    async fn health_check(&self) -> DirectoryResult<()> {
        self.backend().health_check().await.map_err(DirectoryError::from)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> DirectoryResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        crosschain_storage::StorageError::serialization_with_source("failed to encode response", e)
            .into()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crosschain_storage::MemoryBackend;

    use super::*;
    use crate::{channel::DEFAULT_SCOPE, regional::RegionalShard};

    fn empty_registry() -> Arc<ShardRegistry> {
        Arc::new(ShardRegistry::builder(DEFAULT_SCOPE).build().unwrap())
    }

    #[tokio::test]
    async fn test_init_ledger_seeds_five_entries() {
        let directory =
            GlobalDirectory::builder().store(MemoryBackend::new()).registry(empty_registry()).build();
        directory.init_ledger().await.unwrap();

        let entries: Vec<_> = directory.list_all().await.unwrap().map(Result::unwrap).collect();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0], DirectoryEntry::new("HP1", "regionalCC1"));
        assert_eq!(entries[4], DirectoryEntry::new("HP5", "regionalCC5"));
    }

    #[tokio::test]
    async fn test_transfer_shard_changes_only_shard() {
        let directory =
            GlobalDirectory::builder().store(MemoryBackend::new()).registry(empty_registry()).build();
        let entry = DirectoryEntry::builder()
            .owner_id("HP1")
            .shard("regionalA")
            .record_id("pc2")
            .file_count(3)
            .build();
        directory.create(&entry).await.unwrap();

        let moved = directory.transfer_shard("HP1", "regionalB").await.unwrap();
        assert_eq!(moved, DirectoryEntry { shard: "regionalB".into(), ..entry });
        assert_eq!(directory.read("HP1").await.unwrap(), moved);
    }

    #[tokio::test]
    async fn test_record_id_falls_back_to_owner_id() {
        let regional = Arc::new(RegionalShard::new(MemoryBackend::new()));
        regional
            .create(
                &RegionalRecord::builder()
                    .id("HP7")
                    .color("yellow")
                    .size(300)
                    .owner("PATIENT RG 3")
                    .appraised_value(30)
                    .build(),
            )
            .await
            .unwrap();
        let registry = Arc::new(
            ShardRegistry::builder(DEFAULT_SCOPE).register("regionalCC3", regional).build().unwrap(),
        );
        let directory =
            GlobalDirectory::builder().store(MemoryBackend::new()).registry(registry).build();
        directory.create(&DirectoryEntry::new("HP7", "regionalCC3")).await.unwrap();

        let record = directory.resolve_by_owner("HP7", None).await.unwrap();
        assert_eq!(record.owner, "PATIENT RG 3");

        assert_eq!(directory.metrics().snapshot(Hop::Resolve).count, 1);
        assert_eq!(directory.metrics().snapshot(Hop::CrossShard).count, 1);
        assert_eq!(directory.metrics().snapshot(Hop::IndexLookup).count, 1);
    }

    #[tokio::test]
    async fn test_endpoint_argument_checks() {
        let directory =
            GlobalDirectory::builder().store(MemoryBackend::new()).registry(empty_registry()).build();
        let response = directory.handle(OP_READ_REGIONAL_ASSET, &["pc1".into()]).await;
        assert_eq!(response.status, crate::channel::Status::Error);

        let response = directory.handle(OP_READ_ASSET, &["HP1".into()]).await;
        assert_eq!(response.status, crate::channel::Status::NotFound);
    }
}
